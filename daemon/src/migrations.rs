use rusqlite::{params, Connection, Result};
const SCHEMA_VERSION: i32 = 2;

pub struct Migrator {
    conn: Connection,
}

impl Migrator {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn run_migrations(&mut self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        let current_version = self.get_current_version()?;
        log::info!("Current database schema version: {}", current_version);

        if current_version < SCHEMA_VERSION {
            log::info!("Migrating database from version {} to {}", current_version, SCHEMA_VERSION);
            self.migrate_from(current_version)?;
        }

        Ok(())
    }

    fn get_current_version(&self) -> Result<i32> {
        let version: Option<i32> = self.conn.query_row(
            "SELECT MAX(version) FROM schema_version",
            [],
            |row| row.get(0),
        )?;
        Ok(version.unwrap_or(0))
    }

    fn migrate_from(&mut self, from_version: i32) -> Result<()> {
        let tx = self.conn.transaction()?;

        for version in (from_version + 1)..=SCHEMA_VERSION {
            log::info!("Applying migration to version {}", version);
            match version {
                1 => Self::migrate_to_v1_impl(&tx)?,
                2 => Self::migrate_to_v2_impl(&tx)?,
                _ => return Err(rusqlite::Error::InvalidQuery),
            }

            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![version],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn migrate_to_v1_impl(tx: &rusqlite::Transaction) -> Result<()> {
        tx.execute(
            "CREATE TABLE IF NOT EXISTS job_queue (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                client_host TEXT NOT NULL,
                job_type TEXT NOT NULL,
                job_arg TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'new',
                ctime INTEGER NOT NULL,
                mtime INTEGER NOT NULL,
                stime INTEGER
            )",
            [],
        )?;

        tx.execute(
            "CREATE TABLE IF NOT EXISTS job_result (
                job_id INTEGER PRIMARY KEY,
                result TEXT NOT NULL,
                result_info TEXT NOT NULL,
                run_time REAL NOT NULL DEFAULT 0,
                FOREIGN KEY (job_id) REFERENCES job_queue(id)
            )",
            [],
        )?;

        Ok(())
    }

    fn migrate_to_v2_impl(tx: &rusqlite::Transaction) -> Result<()> {
        // Host that claimed the job; client_host stays the creator.
        tx.execute("ALTER TABLE job_queue ADD COLUMN worker_host TEXT", [])?;

        tx.execute(
            "CREATE INDEX IF NOT EXISTS idx_job_queue_status_ctime ON job_queue(status, ctime, id)",
            [],
        )?;

        Ok(())
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }
}
