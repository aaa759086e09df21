//! "Managed by Terraform" description marker

pub const MANAGED_BY_TERRAFORM: &str = "Managed by Terraform";

/// Description sent to the API: the user's text followed by the marker
pub fn annotate(description: Option<&str>) -> String {
    match description {
        Some(text) if !text.is_empty() => format!("{} {}", text, MANAGED_BY_TERRAFORM),
        _ => MANAGED_BY_TERRAFORM.to_string(),
    }
}

/// Inverse of [`annotate`]. `None` when nothing but the marker and whitespace remains.
pub fn strip(description: &str) -> Option<String> {
    let text = description
        .strip_suffix(MANAGED_BY_TERRAFORM)
        .unwrap_or(description)
        .trim();
    (!text.is_empty()).then(|| text.to_string())
}
