use rusqlite::params;

use super::Store;
use crate::error::StoreError;

impl Store {
    /// Inserts or updates a computer record by hostname.
    #[allow(clippy::too_many_arguments)]
    pub async fn register_computer(
        &self,
        hostname: &str,
        os: &str,
        cpu: &str,
        gpu: &str,
        ram_gb: f64,
        notes: &str,
    ) -> Result<(), StoreError> {
        let conn = self.writer.lock().await;
        conn.execute(
            "INSERT INTO computers (hostname, os, cpu, gpu, ram_gb, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(hostname) DO UPDATE SET os=excluded.os, cpu=excluded.cpu, \
             gpu=excluded.gpu, ram_gb=excluded.ram_gb, notes=excluded.notes, \
             last_seen=datetime('now')",
            params![hostname, os, cpu, gpu, ram_gb, notes],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn register_computer_upserts_by_hostname() {
        let dir = tempdir().expect("tempdir");
        let store = Store::open(&dir.path().join("cortex.db")).expect("open");

        store
            .register_computer("laptop", "linux", "amd", "", 32.0, "")
            .await
            .expect("insert");
        store
            .register_computer("laptop", "linux", "amd", "nvidia", 32.0, "updated")
            .await
            .expect("update");
    }
}
