//! Backup session display formatting

use chrono::Utc;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::{format_duration, format_size};
use crate::api::wire::SessionDetails;
use crate::models::BackupSession;

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "Session")]
    session: String,
    #[tabled(rename = "Operation")]
    operation: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Files")]
    files: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Age")]
    age: String,
}

impl From<&BackupSession> for SessionRow {
    fn from(session: &BackupSession) -> Self {
        Self {
            session: session.session_id.short(),
            operation: session.operation.clone(),
            status: session.status.to_string(),
            files: format!("{}/{}", session.success_count, session.total_files),
            size: format_size(session.total_size),
            age: format_duration(Utc::now() - session.start_time),
        }
    }
}

/// Sessions as a bordered table
pub fn format_session_table(sessions: &[BackupSession]) -> String {
    if sessions.is_empty() {
        return "No backup sessions found.".to_string();
    }

    let rows: Vec<SessionRow> = sessions.iter().map(SessionRow::from).collect();
    Table::new(rows).with(Style::modern()).to_string()
}

/// Sessions as a compact numbered list
pub fn format_session_list(sessions: &[BackupSession]) -> String {
    if sessions.is_empty() {
        return "No backup sessions found.".to_string();
    }

    let mut output = String::new();
    for (i, session) in sessions.iter().enumerate() {
        output.push_str(&format!(
            "  {}. {} {} [{}] {} files, {} ({} ago)\n",
            i + 1,
            session.session_id,
            session.operation,
            session.status,
            session.total_files,
            format_size(session.total_size),
            format_duration(Utc::now() - session.start_time),
        ));
    }
    output.push_str(&format!("\nTotal: {} session(s)", sessions.len()));
    output
}

/// One session with its entries and integrity verdict
pub fn format_session_details(details: &SessionDetails) -> String {
    let session = &details.session;
    let mut output = String::new();

    output.push_str(&format!("Session:   {}\n", session.session_id));
    output.push_str(&format!("Operation: {}\n", session.operation));
    output.push_str(&format!("Status:    {}\n", session.status));
    output.push_str(&format!(
        "Started:   {}\n",
        session.start_time.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(end) = session.end_time {
        output.push_str(&format!("Finished:  {}\n", end.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    output.push_str(&format!(
        "Files:     {} ({} ok, {} failed)\n",
        session.total_files, session.success_count, session.failure_count
    ));
    output.push_str(&format!(
        "Size:      {} ({} stored)\n",
        format_size(session.total_size),
        format_size(session.backup_size)
    ));
    if let Some(error) = &session.error {
        output.push_str(&format!("Error:     {}\n", error));
    }
    output.push_str(&format!(
        "Integrity: {}\n",
        if details.integrity_valid { "OK" } else { "FAILED" }
    ));
    for error in &details.integrity_errors {
        output.push_str(&format!("  ! {}\n", error));
    }

    if !session.entries.is_empty() {
        output.push('\n');
        for entry in &session.entries {
            let marker = if entry.success { "ok " } else { "ERR" };
            output.push_str(&format!(
                "  {} {:>10}  {}",
                marker,
                format_size(entry.size),
                entry.original_path.display()
            ));
            if let Some(error) = &entry.error {
                output.push_str(&format!("  ({})", error));
            }
            output.push('\n');
        }
    }

    output.push_str(&format!(
        "\nRestorable: {} file(s)",
        details.restorable_files.len()
    ));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BackupEntry;

    #[test]
    fn test_empty_list() {
        assert_eq!(format_session_table(&[]), "No backup sessions found.");
        assert_eq!(format_session_list(&[]), "No backup sessions found.");
    }

    #[test]
    fn test_table_has_headers_and_rows() {
        let mut session = BackupSession::new("cache_cleanup");
        session
            .push_entry(BackupEntry::succeeded("/tmp/a", "/b/1", 2048, "x"))
            .unwrap();

        let table = format_session_table(&[session.clone()]);
        assert!(table.contains("Operation"));
        assert!(table.contains("cache_cleanup"));
        assert!(table.contains(&session.session_id.short()));
        assert!(table.contains("2.0 KB"));
    }

    #[test]
    fn test_details_show_failed_entries() {
        let mut session = BackupSession::new("manual_deletion");
        session
            .push_entry(BackupEntry::failed("/tmp/dir", 0, "directories cannot be backed up"))
            .unwrap();
        let details = SessionDetails {
            session,
            integrity_valid: true,
            integrity_errors: Vec::new(),
            restorable_files: Vec::new(),
            can_restore: false,
        };

        let text = format_session_details(&details);
        assert!(text.contains("ERR"));
        assert!(text.contains("directories cannot be backed up"));
        assert!(text.contains("Restorable: 0 file(s)"));
    }
}
