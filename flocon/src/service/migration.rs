//! Runs the SQL migration scripts of a directory against the database, once each
use crate::error::FloconError;
use crate::repository::migration_repository::MigrationRepository;
use crate::types::MigrationRecord;
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Scripts in the migration directory that are run by hand, never by the runner
pub const SKIPPED_PREFIXES: [&str; 6] = ["NUCLEAR", "README", "FIX-", "CLEAN-", "0-inspect", "OPTIMIZED"];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MigrationRun {
    /// Migration files found, after filtering
    pub found: usize,
    pub already_executed: Vec<String>,
    pub executed: Vec<String>,
}

impl MigrationRun {
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.executed.is_empty()
    }
}

pub struct MigrationService {
    repo: Arc<dyn MigrationRepository>,
}

impl MigrationService {
    pub fn new(repo: Arc<dyn MigrationRepository>) -> Self {
        Self { repo }
    }

    /// Executes the pending migrations of `dir` in file name order.
    ///
    /// # Errors
    /// Stops at the first script that fails, with a `Migration` error naming it. Scripts
    /// executed before the failure stay recorded.
    pub async fn run(&self, dir: &Path) -> Result<MigrationRun, FloconError> {
        info!("Ensuring migration tracking table exists...");
        self.repo.ensure_history_table().await?;

        let executed: HashSet<String> = self
            .repo
            .executed()
            .await?
            .into_iter()
            .map(|m| m.filename)
            .collect();
        info!("{} migrations already executed", executed.len());

        let files = migration_files(dir)?;
        let mut run = MigrationRun {
            found: files.len(),
            ..Default::default()
        };

        for path in files {
            let filename = file_name(&path);
            if executed.contains(&filename) {
                debug!("Skipping {filename} (already executed)");
                run.already_executed.push(filename);
                continue;
            }

            info!("Executing {filename}...");
            let sql = fs::read_to_string(&path).map_err(|e| FloconError::Migration {
                filename: filename.clone(),
                reason: e.to_string(),
            })?;
            self.repo
                .exec_sql(&sql)
                .await
                .map_err(|e| FloconError::Migration {
                    filename: filename.clone(),
                    reason: e.to_string(),
                })?;
            self.repo.record(&filename, &checksum(&sql)).await?;
            info!("{filename} completed successfully");
            run.executed.push(filename);
        }
        Ok(run)
    }

    /// Executed migrations, oldest first
    ///
    /// # Errors
    /// Returns an error if the history can not be read
    pub async fn status(&self) -> Result<Vec<MigrationRecord>, FloconError> {
        self.repo.executed().await
    }
}

/// SHA-256 of the script, hex encoded
#[must_use]
pub fn checksum(sql: &str) -> String {
    format!("{:x}", Sha256::digest(sql.as_bytes()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The `*.sql` files of `dir` the runner is allowed to execute, sorted by name
///
/// # Errors
/// Returns an error if the directory can not be read
pub fn migration_files(dir: &Path) -> Result<Vec<PathBuf>, FloconError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            let name = file_name(path);
            name.ends_with(".sql") && !SKIPPED_PREFIXES.iter().any(|p| name.starts_with(p))
        })
        .collect();
    files.sort_by_key(|path| file_name(path));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::mocks::MockMigrationRepo;
    use tempfile::TempDir;

    fn migration_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, sql) in files {
            fs::write(dir.path().join(name), sql).unwrap();
        }
        dir
    }

    #[test]
    fn manual_scripts_are_left_out() {
        let dir = migration_dir(&[
            ("002_tokens.sql", ""),
            ("001_init.sql", ""),
            ("NUCLEAR-reset.sql", ""),
            ("FIX-duplicates.sql", ""),
            ("0-inspect-schema.sql", ""),
            ("notes.md", ""),
        ]);
        let names: Vec<String> = migration_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["001_init.sql", "002_tokens.sql"]);
    }

    #[test]
    fn checksum_is_sha256_hex() {
        assert_eq!(
            checksum(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn pending_scripts_run_in_order() {
        let dir = migration_dir(&[
            ("001_init.sql", "CREATE TABLE a (id TEXT);"),
            ("002_more.sql", "CREATE TABLE b (id TEXT);"),
            ("003_last.sql", "CREATE TABLE c (id TEXT);"),
        ]);
        let mut repo = MockMigrationRepo::new();
        repo.expect_ensure_history_table().times(1).returning(|| Ok(()));
        repo.expect_executed().returning(|| {
            Ok(vec![MigrationRecord {
                filename: "001_init.sql".into(),
                executed_at: None,
                checksum: None,
            }])
        });
        let mut seq = mockall::Sequence::new();
        repo.expect_exec_sql()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|sql: &str| sql.contains("TABLE b"))
            .returning(|_| Ok(()));
        repo.expect_record()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|name: &str, _: &str| name == "002_more.sql")
            .returning(|_, _| Ok(()));
        repo.expect_exec_sql()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|sql: &str| sql.contains("TABLE c"))
            .returning(|_| Ok(()));
        repo.expect_record()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|name: &str, checksum: &str| name == "003_last.sql" && checksum.len() == 64)
            .returning(|_, _| Ok(()));

        let run = MigrationService::new(Arc::new(repo)).run(dir.path()).await.unwrap();
        assert_eq!(run.found, 3);
        assert_eq!(run.already_executed, vec!["001_init.sql"]);
        assert_eq!(run.executed, vec!["002_more.sql", "003_last.sql"]);
    }

    #[tokio::test]
    async fn first_failure_stops_the_run() {
        let dir = migration_dir(&[("001_bad.sql", "CREATE TABEL"), ("002_good.sql", "SELECT 1;")]);
        let mut repo = MockMigrationRepo::new();
        repo.expect_ensure_history_table().returning(|| Ok(()));
        repo.expect_executed().returning(|| Ok(vec![]));
        repo.expect_exec_sql()
            .times(1)
            .returning(|_| Err(FloconError::Sql("syntax error".into())));
        repo.expect_record().never();

        let err = MigrationService::new(Arc::new(repo))
            .run(dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, FloconError::Migration { ref filename, .. } if filename == "001_bad.sql"));
    }
}
