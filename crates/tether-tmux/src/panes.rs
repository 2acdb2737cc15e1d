use serde::Serialize;

/// `list-panes -F` format; fields are tab separated so paths with spaces survive.
pub const PANE_FORMAT: &str =
    "#{pane_id}\t#{pane_current_path}\t#{pane_current_command}\t#{pane_title}";

/// What tmux reports about one pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaneMetadata {
    pub pane_id: String,
    pub working_dir: String,
    pub command: String,
    pub title: String,
}

/// Parse `list-panes` output produced with [`PANE_FORMAT`].
///
/// Lines without a pane id are skipped. A title containing tabs is kept whole.
pub fn parse_panes(stdout: &str) -> Vec<PaneMetadata> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(4, '\t');
            let pane_id = fields.next()?.trim();
            if !pane_id.starts_with('%') {
                return None;
            }
            Some(PaneMetadata {
                pane_id: pane_id.to_string(),
                working_dir: fields.next().unwrap_or("").to_string(),
                command: fields.next().unwrap_or("").to_string(),
                title: fields.next().unwrap_or("").to_string(),
            })
        })
        .collect()
}
