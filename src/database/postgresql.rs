use super::process::{CommandRunner, Invocation, ProcessOutput};
use super::tools::{ToolResolver, PG_DUMP, PSQL};
use super::version::{dump_tool_version_token, server_version_token};
use super::{ConnectionProfile, Database, ScopeFilter};
use crate::error::{OpError, OpResult};
use crate::table::TableName;
use std::ops::Deref;
use std::path::Path;

const LIST_TABLES_QUERY: &str = "SELECT schemaname || '.' || tablename \
     FROM pg_tables \
     WHERE schemaname NOT IN ('pg_catalog', 'information_schema') \
     ORDER BY schemaname, tablename;";

/// PostgreSQL driven through `pg_dump` and `psql`.
pub struct PostgreSql {
    profile: ConnectionProfile,
    resolver: Box<dyn ToolResolver>,
    runner: Box<dyn CommandRunner>,
}

impl Deref for PostgreSql {
    type Target = ConnectionProfile;

    fn deref(&self) -> &Self::Target {
        &self.profile
    }
}

impl PostgreSql {
    pub fn with_collaborators(
        profile: ConnectionProfile,
        resolver: Box<dyn ToolResolver>,
        runner: Box<dyn CommandRunner>,
    ) -> Self {
        PostgreSql {
            profile,
            resolver,
            runner,
        }
    }

    /// `<tool> -h <host> -p <port> -U <user> -d <db>` with the password scoped to this child.
    fn connect(&self, tool: &str) -> Invocation {
        Invocation::new(self.resolver.resolve(tool))
            .arg("-h")
            .arg(&self.host)
            .arg("-p")
            .arg(self.port.to_string())
            .arg("-U")
            .arg(&self.user)
            .arg("-d")
            .arg(&self.database)
            .env("PGPASSWORD", &self.password)
    }

    fn psql_command(&self, command: impl Into<String>) -> Invocation {
        self.connect(PSQL).arg("-c").arg(command)
    }

    async fn execute(&self, invocation: Invocation) -> OpResult<ProcessOutput> {
        let tool = invocation.tool_name();
        let output = self
            .runner
            .run(&invocation)
            .await
            .map_err(|source| OpError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        if !output.success {
            return Err(OpError::ProcessFailure {
                tool,
                stderr: output.stderr_text(),
            });
        }
        Ok(output)
    }
}

fn with_scope(mut invocation: Invocation, scope: &ScopeFilter) -> Invocation {
    for schema in &scope.schemas {
        invocation = invocation.arg("-n").arg(schema);
    }
    for table in &scope.tables {
        invocation = invocation.arg("-t").arg(table);
    }
    invocation
}

/// Single-quoted SQL literal for a file path.
fn quote_path(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "''"))
}

#[async_trait::async_trait]
impl Database for PostgreSql {
    async fn server_version(&self) -> OpResult<String> {
        let query = self.connect(PSQL).arg("-t").arg("-c").arg("SELECT version();");
        let output = self.execute(query).await?;
        server_version_token(&output.stdout_text()).ok_or_else(|| {
            OpError::VersionIncompatible("server returned no version string".into())
        })
    }

    async fn dump_tool_version(&self) -> OpResult<String> {
        let query = Invocation::new(self.resolver.resolve(PG_DUMP)).arg("--version");
        let output = self.execute(query).await?;
        dump_tool_version_token(&output.stdout_text()).ok_or_else(|| {
            OpError::VersionIncompatible("pg_dump returned no version string".into())
        })
    }

    async fn dump(&self, destination: &Path, scope: &ScopeFilter) -> OpResult<()> {
        let cmd = self
            .connect(PG_DUMP)
            .arg("-F")
            .arg("p")
            .arg("-f")
            .arg(destination.display().to_string());
        self.execute(with_scope(cmd, scope)).await?;
        Ok(())
    }

    async fn apply_sql(&self, sql: Vec<u8>, scope: &ScopeFilter) -> OpResult<()> {
        let cmd = self.connect(PSQL).arg("-v").arg("ON_ERROR_STOP=1");
        self.execute(with_scope(cmd, scope).stdin(sql)).await?;
        Ok(())
    }

    async fn list_tables(&self) -> OpResult<Vec<String>> {
        let cmd = self
            .connect(PSQL)
            .arg("-t")
            .arg("-A")
            .arg("-c")
            .arg(LIST_TABLES_QUERY);
        let output = self.execute(cmd).await?;
        Ok(output
            .stdout_text()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn copy_to_csv(&self, table: &TableName, file: &Path) -> OpResult<()> {
        let copy = format!("\\COPY {} TO {} WITH CSV HEADER", table, quote_path(file));
        self.execute(self.psql_command(copy)).await?;
        Ok(())
    }

    async fn copy_from_csv(&self, table: &TableName, file: &Path) -> OpResult<()> {
        let copy = format!("\\COPY {} FROM {} WITH CSV HEADER", table, quote_path(file));
        self.execute(self.psql_command(copy)).await?;
        Ok(())
    }

    async fn truncate(&self, table: &TableName) -> OpResult<()> {
        self.execute(self.psql_command(format!("TRUNCATE TABLE {}", table)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::process::testing::ScriptedRunner;
    use crate::database::tools::BinDirResolver;
    use std::path::PathBuf;

    fn profile() -> ConnectionProfile {
        ConnectionProfile {
            host: "db.local".into(),
            port: 5433,
            database: "keap_db".into(),
            user: "postgres".into(),
            password: "secret".into(),
        }
    }

    fn postgres(runner: &ScriptedRunner) -> PostgreSql {
        PostgreSql::with_collaborators(
            profile(),
            Box::new(BinDirResolver::default()),
            Box::new(runner.clone()),
        )
    }

    fn args(invocation: &Invocation) -> Vec<&str> {
        invocation.args.iter().map(String::as_str).collect()
    }

    #[tokio::test]
    async fn test_dump_builds_plain_format_command_with_scope() {
        let runner = ScriptedRunner::default();
        let db = postgres(&runner);
        let scope = ScopeFilter::new(
            vec!["public".into(), "sales".into()],
            vec!["public.users".into()],
        );

        db.dump(Path::new("/backups/backup_20240101_000000.sql"), &scope)
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, PathBuf::from("pg_dump"));
        assert_eq!(
            args(&calls[0]),
            vec![
                "-h", "db.local", "-p", "5433", "-U", "postgres", "-d", "keap_db", "-F", "p",
                "-f", "/backups/backup_20240101_000000.sql", "-n", "public", "-n", "sales",
                "-t", "public.users",
            ]
        );
        assert_eq!(calls[0].env_value("PGPASSWORD"), Some("secret"));
        assert!(!calls[0].args.iter().any(|a| a.contains("secret")));
    }

    #[tokio::test]
    async fn test_dump_failure_carries_stderr() {
        let runner = ScriptedRunner::default();
        runner.push_fail(1, "pg_dump: error: connection refused\n");
        let db = postgres(&runner);

        let err = db
            .dump(Path::new("/tmp/out.sql"), &ScopeFilter::default())
            .await
            .unwrap_err();
        match err {
            OpError::ProcessFailure { tool, stderr } => {
                assert_eq!(tool, "pg_dump");
                assert_eq!(stderr, "pg_dump: error: connection refused");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_apply_sql_stops_on_first_error() {
        let runner = ScriptedRunner::default();
        let db = postgres(&runner);

        db.apply_sql(b"SELECT 1;".to_vec(), &ScopeFilter::default())
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].program, PathBuf::from("psql"));
        let argv = args(&calls[0]);
        let pos = argv.iter().position(|a| *a == "-v").unwrap();
        assert_eq!(argv[pos + 1], "ON_ERROR_STOP=1");
        assert_eq!(calls[0].stdin.as_deref(), Some(&b"SELECT 1;"[..]));
    }

    #[tokio::test]
    async fn test_apply_sql_nonzero_exit_is_failure() {
        let runner = ScriptedRunner::default();
        runner.push_fail(3, "ERROR:  relation \"users\" already exists");
        let db = postgres(&runner);

        let err = db
            .apply_sql(b"CREATE TABLE users();".to_vec(), &ScopeFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OpError::ProcessFailure { .. }));
    }

    #[tokio::test]
    async fn test_versions_are_parsed_from_tool_output() {
        let runner = ScriptedRunner::default();
        runner.push_ok(" PostgreSQL 16.2 on x86_64-pc-linux-gnu, compiled by gcc\n\n");
        runner.push_ok("pg_dump (PostgreSQL) 17.0\n");
        let db = postgres(&runner);

        assert_eq!(db.server_version().await.unwrap(), "16.2");
        assert_eq!(db.dump_tool_version().await.unwrap(), "17.0");

        let calls = runner.calls();
        assert!(args(&calls[0]).ends_with(&["-t", "-c", "SELECT version();"]));
        assert_eq!(args(&calls[1]), vec!["--version"]);
        assert_eq!(calls[1].env_value("PGPASSWORD"), None);
    }

    #[tokio::test]
    async fn test_empty_version_output_is_gate_failure() {
        let runner = ScriptedRunner::default();
        runner.push_ok("");
        let db = postgres(&runner);
        assert!(matches!(
            db.server_version().await,
            Err(OpError::VersionIncompatible(_))
        ));
    }

    #[tokio::test]
    async fn test_spawn_error_is_reported() {
        let runner = ScriptedRunner::default();
        runner.push_spawn_error();
        let db = postgres(&runner);
        assert!(matches!(
            db.dump_tool_version().await,
            Err(OpError::Spawn { ref tool, .. }) if tool == "pg_dump"
        ));
    }

    #[tokio::test]
    async fn test_list_tables_trims_output() {
        let runner = ScriptedRunner::default();
        runner.push_ok("public.orders\n public.users \n\nsales.invoices\n");
        let db = postgres(&runner);

        let tables = db.list_tables().await.unwrap();
        assert_eq!(tables, vec!["public.orders", "public.users", "sales.invoices"]);

        let calls = runner.calls();
        let last = calls[0].args.last().unwrap();
        assert!(last.contains("pg_tables"));
        assert!(last.contains("NOT IN ('pg_catalog', 'information_schema')"));
        assert!(last.contains("ORDER BY schemaname, tablename"));
    }

    #[tokio::test]
    async fn test_copy_commands() {
        let runner = ScriptedRunner::default();
        let db = postgres(&runner);
        let table = TableName::new("public", "users");

        db.copy_to_csv(&table, Path::new("/out/public.users.csv"))
            .await
            .unwrap();
        db.truncate(&table).await.unwrap();
        db.copy_from_csv(&table, Path::new("/in/o'brien/public.users.csv"))
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(
            calls[0].args.last().unwrap(),
            "\\COPY public.users TO '/out/public.users.csv' WITH CSV HEADER"
        );
        assert_eq!(calls[1].args.last().unwrap(), "TRUNCATE TABLE public.users");
        assert_eq!(
            calls[2].args.last().unwrap(),
            "\\COPY public.users FROM '/in/o''brien/public.users.csv' WITH CSV HEADER"
        );
    }
}
