use memoria_core::models::{AccountOverview, ReportView};

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn report_rows(reports: &[ReportView]) -> Vec<String> {
    let mut rows = vec![format!(
        "{:<36}  {:<9}  {:<16}  {:<24}  {}",
        "REPORT", "STATUS", "OWNER", "SUB-COLLECTION", "REASON"
    )];
    for report in reports {
        let sub_collection = if report.sub_collection_deleted {
            format!("{} (deleted)", report.sub_collection_name)
        } else {
            report.sub_collection_name.clone()
        };
        rows.push(format!(
            "{:<36}  {:<9}  {:<16}  {:<24}  {}",
            report.id,
            format!("{:?}", report.status).to_lowercase(),
            truncate_string(&report.owner_username, 16),
            truncate_string(&sub_collection, 24),
            truncate_string(&report.reason, 40),
        ));
    }
    rows
}

pub fn account_rows(accounts: &[AccountOverview]) -> Vec<String> {
    let mut rows = vec![format!(
        "{:<36}  {:<16}  {:<9}  {:>5}  {:>7}",
        "ACCOUNT", "USERNAME", "STATUS", "POSTS", "REPORTS"
    )];
    for account in accounts {
        rows.push(format!(
            "{:<36}  {:<16}  {:<9}  {:>5}  {:>7}",
            account.id,
            truncate_string(&account.username, 16),
            account.status.to_string(),
            account.post_count,
            account.report_count,
        ));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
        assert_eq!(truncate_string("hello", 5), "hello");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
        assert_eq!(truncate_string("hello", 0), "...");
    }

    #[test]
    fn truncate_string_counts_characters() {
        assert_eq!(truncate_string("서울특별시청", 5), "서울...");
        assert_eq!(truncate_string("서울", 2), "서울");
    }

    #[test]
    fn account_rows_have_header() {
        let rows = account_rows(&[]);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].starts_with("ACCOUNT"));
    }
}
