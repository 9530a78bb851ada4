// Duration rendering for track and playlist summaries

/// Render seconds as `MM:SS`. Minutes are not capped, so an hour-long
/// track renders as `60:00`.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (minutes, seconds) = (seconds / 60, seconds % 60);
    format!("{:02}:{:02}", minutes, seconds)
}

/// Render seconds as `HH:MM:SS` when there is at least one hour, otherwise
/// `MM:SS`. Used for playlist totals.
pub fn format_playlist_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (hours, remainder) = (seconds / 3600, seconds % 3600);
    let (minutes, seconds) = (remainder / 60, remainder % 60);
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
