//! The database init script injected into new containers.

use chrono::Utc;

use crate::config::{EXPORT_DATA_MOUNT, INIT_SCRIPT_NAME, POSTGRES_USER};
use crate::error_handling::ContainerError;

/// Shell script run by the postgres entrypoint on first start: creates the
/// database, then runs the export's `setup.sql` and `load.sql`.
pub fn init_script(database_name: &str) -> String {
    format!(
        "createdb -U {user} {db}\n\
         cd {mount}\n\
         psql -e -U {user} -d {db} -f setup.sql\n\
         psql -e -U {user} -d {db} -f load.sql\n",
        user = POSTGRES_USER,
        db = shell_quote(database_name),
        mount = EXPORT_DATA_MOUNT,
    )
}

// Single-quotes a value for sh, closing and reopening around embedded quotes
fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Packs the init script into a single-entry tar archive.
pub fn init_script_archive(database_name: &str) -> Result<Vec<u8>, ContainerError> {
    let script = init_script(database_name);
    let data = script.as_bytes();

    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o755);
    header.set_mtime(Utc::now().timestamp().max(0) as u64);
    header.set_cksum();

    let mut builder = tar::Builder::new(Vec::new());
    builder.append_data(&mut header, INIT_SCRIPT_NAME, data)?;
    builder.into_inner().map_err(ContainerError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_script_contents() {
        let script = init_script("machine-learning");
        assert!(script.contains("createdb -U postgres machine-learning"));
        assert!(script.contains("cd /mnt/exportData"));
        assert!(script.contains("psql -e -U postgres -d machine-learning -f setup.sql"));
        assert!(script.contains("psql -e -U postgres -d machine-learning -f load.sql"));
        let setup = script.find("setup.sql").unwrap();
        let load = script.find("load.sql").unwrap();
        assert!(setup < load);
    }

    #[test]
    fn test_database_name_quoted() {
        assert_eq!(shell_quote("ml"), "ml");
        assert_eq!(shell_quote("my db"), "'my db'");
        assert_eq!(shell_quote("o'brien"), r"'o'\''brien'");
    }

    #[test]
    fn test_archive_holds_single_script() {
        let bytes = init_script_archive("ml").unwrap();
        let mut archive = tar::Archive::new(bytes.as_slice());
        let mut entries = archive.entries().unwrap();

        let mut entry = entries.next().unwrap().unwrap();
        assert_eq!(entry.path().unwrap().to_str(), Some("init-user-db.sh"));
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, init_script("ml"));
        drop(entry);

        assert!(entries.next().is_none());
    }
}
