//! Tests for CLI subcommand parsing.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use research_exports::config::{
    interval_from_args, Cli, Command, ConfigCommand, ContainersCommand, DbCommand, JobsCommand,
    LogFormat, RequestCommand,
};
use research_exports::models::{AnonymityLevel, SchemaName, ScopeSelector, UserIdHashing};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).expect("Should parse")
}

#[test]
fn test_tables_request_defaults() {
    let cli = parse(&[
        "research_exports",
        "jobs",
        "request",
        "tables",
        "--course-slug",
        "machine-learning",
        "--purpose",
        "research",
    ]);
    let Command::Jobs {
        command: JobsCommand::Request {
            kind: RequestCommand::Tables(args),
        },
    } = cli.command
    else {
        panic!("expected jobs request tables");
    };
    assert_eq!(
        args.scope.selector().unwrap(),
        ScopeSelector::CourseSlug("machine-learning".to_string())
    );
    assert_eq!(args.user_id_hashing, UserIdHashing::Isolated);
    assert_eq!(
        AnonymityLevel::from(args.user_id_hashing),
        AnonymityLevel::Isolated
    );
    assert!(args.schemas.is_empty());
    assert_eq!(args.purpose, "research");
}

#[test]
fn test_tables_request_with_schemas_and_linked_hashing() {
    let cli = parse(&[
        "research_exports",
        "jobs",
        "request",
        "tables",
        "--partner-id",
        "17",
        "--purpose",
        "p",
        "--user-id-hashing",
        "linked",
        "--schemas",
        "users",
        "course_grades",
    ]);
    let Command::Jobs {
        command: JobsCommand::Request {
            kind: RequestCommand::Tables(args),
        },
    } = cli.command
    else {
        panic!("expected jobs request tables");
    };
    assert_eq!(args.scope.selector().unwrap(), ScopeSelector::PartnerId(17));
    assert_eq!(args.user_id_hashing, UserIdHashing::Linked);
    assert_eq!(args.schemas, vec![SchemaName::Users, SchemaName::CourseGrades]);
}

#[test]
fn test_two_scope_identifiers_rejected() {
    let result = Cli::try_parse_from([
        "research_exports",
        "jobs",
        "request",
        "tables",
        "--course-id",
        "c1",
        "--group-id",
        "g1",
        "--purpose",
        "p",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_missing_scope_rejected() {
    let result = Cli::try_parse_from([
        "research_exports",
        "jobs",
        "request",
        "tables",
        "--purpose",
        "p",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_clickstream_request_interval() {
    let cli = parse(&[
        "research_exports",
        "jobs",
        "request",
        "clickstream",
        "--course-id",
        "c1",
        "--purpose",
        "p",
        "--interval",
        "2016-08-01",
        "2016-08-04",
        "--ignore-existing",
    ]);
    let Command::Jobs {
        command: JobsCommand::Request {
            kind: RequestCommand::Clickstream(args),
        },
    } = cli.command
    else {
        panic!("expected jobs request clickstream");
    };
    let interval = interval_from_args(args.interval.as_deref()).expect("interval");
    assert_eq!(interval.start, NaiveDate::from_ymd_opt(2016, 8, 1).unwrap());
    assert_eq!(interval.end, NaiveDate::from_ymd_opt(2016, 8, 4).unwrap());
    assert!(args.ignore_existing);
}

#[test]
fn test_jobs_download_default_dest() {
    let cli = parse(&["research_exports", "jobs", "download", "job-1"]);
    let Command::Jobs {
        command: JobsCommand::Download { id, dest },
    } = cli.command
    else {
        panic!("expected jobs download");
    };
    assert_eq!(id, "job-1");
    assert_eq!(dest, PathBuf::from("."));
}

#[test]
fn test_underscore_subcommand_names() {
    assert!(matches!(
        parse(&["research_exports", "jobs", "get_all"]).command,
        Command::Jobs {
            command: JobsCommand::GetAll
        }
    ));
    assert!(matches!(
        parse(&["research_exports", "db", "list_tables", "ml"]).command,
        Command::Db {
            command: DbCommand::ListTables { .. },
            ..
        }
    ));
}

#[test]
fn test_containers_create_sources_are_exclusive() {
    let cli = parse(&[
        "research_exports",
        "containers",
        "create",
        "--export-request-id",
        "job-1",
        "--container-name",
        "ml",
    ]);
    let Command::Containers {
        command: ContainersCommand::Create(args),
        docker,
    } = cli.command
    else {
        panic!("expected containers create");
    };
    assert_eq!(args.source.export_request_id.as_deref(), Some("job-1"));
    assert_eq!(args.container_name.as_deref(), Some("ml"));
    assert_eq!(args.database_name, None);
    assert_eq!(docker.poll_max_attempts, 60);

    let both = Cli::try_parse_from([
        "research_exports",
        "containers",
        "create",
        "--export-request-id",
        "job-1",
        "--export-data-folder",
        "/tmp/export",
    ]);
    assert!(both.is_err());
}

#[test]
fn test_docker_poll_options() {
    let cli = parse(&[
        "research_exports",
        "containers",
        "--poll-interval-seconds",
        "2",
        "--poll-max-attempts",
        "5",
        "start",
        "ml",
    ]);
    let Command::Containers { docker, command } = cli.command else {
        panic!("expected containers");
    };
    assert!(matches!(command, ContainersCommand::Start { .. }));
    let policy = docker.poll_policy();
    assert_eq!(policy.interval.as_secs(), 2);
    assert_eq!(policy.max_attempts, 5);
}

#[test]
fn test_db_unload_to_csv() {
    let cli = parse(&[
        "research_exports",
        "db",
        "unload_to_csv",
        "ml",
        "--relation",
        "users",
        "--dest",
        "out",
    ]);
    let Command::Db {
        command: DbCommand::UnloadToCsv {
            container_name,
            dest,
            relation,
        },
        ..
    } = cli.command
    else {
        panic!("expected db unload_to_csv");
    };
    assert_eq!(container_name, "ml");
    assert_eq!(relation, "users");
    assert_eq!(dest, PathBuf::from("out"));
}

#[test]
fn test_db_create_view_requires_one_source() {
    assert!(Cli::try_parse_from(["research_exports", "db", "create_view", "ml"]).is_err());
    let cli = parse(&[
        "research_exports",
        "db",
        "create_view",
        "ml",
        "--sql-file",
        "views/active.sql",
        "--partner-short-name",
        "stanford",
    ]);
    let Command::Db {
        command: DbCommand::CreateView(args),
        ..
    } = cli.command
    else {
        panic!("expected db create_view");
    };
    assert_eq!(args.source.sql_file, Some(PathBuf::from("views/active.sql")));
    assert_eq!(args.partner_short_name.as_deref(), Some("stanford"));
}

#[test]
fn test_config_and_global_flags() {
    let cli = parse(&[
        "research_exports",
        "config",
        "display-auth-cache",
        "--no-truncate",
        "--log-format",
        "json",
    ]);
    assert!(matches!(cli.log_format, LogFormat::Json));
    assert!(matches!(
        cli.command,
        Command::Config {
            command: ConfigCommand::DisplayAuthCache { no_truncate: true }
        }
    ));
}

#[test]
fn test_version_quiet() {
    assert!(matches!(
        parse(&["research_exports", "version", "-q"]).command,
        Command::Version { quiet: true }
    ));
}

#[test]
fn test_zero_poll_attempts_rejected() {
    let result = Cli::try_parse_from([
        "research_exports",
        "containers",
        "--poll-max-attempts",
        "0",
        "start",
        "ml",
    ]);
    assert!(result.is_err());
}
