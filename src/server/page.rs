/// Server-rendered admin page listing the backups

use super::flash::FlashMessage;
use crate::core::BackupArtifact;
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::utils::encode_uri_component;

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; margin: 2rem; color: #333; }
h1 { font-weight: 300; }
table { border-collapse: collapse; width: 100%; margin-top: 1rem; }
th, td { text-align: left; padding: 0.5rem; border-bottom: 1px solid #eee; }
th { background: #f8f8f8; }
.messages { list-style: none; padding: 0; }
.messages li { padding: 0.6rem 1rem; margin-bottom: 0.4rem; }
.success { background: #dfd; }
.warning { background: #ffc; }
.error { background: #ffefef; color: #ba2121; }
.delete { color: #ba2121; }
button { padding: 0.5rem 1rem; }
"#;

/// Append `?token=...` to a local URL when a token is in use
pub fn with_token(url: &str, token: Option<&str>) -> String {
    match token {
        Some(token) => format!("{}?token={}", url, encode_uri_component(token)),
        None => url.to_string(),
    }
}

pub fn render_backup_list(
    backups: &[BackupArtifact],
    flashes: &[FlashMessage],
    token: Option<&str>,
) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Database Backups</title>\n<style>");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n<h1>Database Backups</h1>\n");

    if !flashes.is_empty() {
        html.push_str("<ul class=\"messages\">\n");
        for flash in flashes {
            html.push_str(&format!(
                "<li class=\"{}\">{}</li>\n",
                flash.level.css_class(),
                encode_text(&flash.text)
            ));
        }
        html.push_str("</ul>\n");
    }

    html.push_str(&format!(
        "<form method=\"post\" action=\"{}\">\n<button type=\"submit\" name=\"_backup\">Create backup</button>\n</form>\n",
        encode_double_quoted_attribute(&with_token("/backup", token))
    ));

    if backups.is_empty() {
        html.push_str("<p>No backups found.</p>\n");
    } else {
        html.push_str("<table>\n<thead><tr><th>Filename</th><th>Date</th><th>Size</th><th>Actions</th></tr></thead>\n<tbody>\n");
        for backup in backups {
            let encoded = encode_uri_component(&backup.file_name);
            let download_url = with_token(&format!("/download/{}", encoded), token);
            let delete_url = with_token(&format!("/delete/{}", encoded), token);

            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>\
                 <a href=\"{}\">Download</a> | \
                 <a href=\"{}\" class=\"delete\" onclick=\"return confirm('Are you sure you want to delete this backup?');\">Delete</a>\
                 </td></tr>\n",
                encode_text(&backup.file_name),
                encode_text(&backup.display_date()),
                encode_text(&backup.display_size()),
                encode_double_quoted_attribute(&download_url),
                encode_double_quoted_attribute(&delete_url),
            ));
        }
        html.push_str("</tbody>\n</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}
