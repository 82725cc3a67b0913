use serde_json::Value;

/// Render a list of tenant JSON views (as returned by `GET /tenants`) as a
/// fixed-width table, newest-first is left to the caller — this just prints
/// in whatever order the server returned them.
pub fn render_tenants_table(tenants: &[Value]) -> String {
    if tenants.is_empty() {
        return "No tenants.".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{:<36} {:<16} {:<12} {:<10} {}\n",
        "ID", "NAME", "STATUS", "RETRIES", "MESSAGE"
    ));
    out.push_str(&"-".repeat(100));
    out.push('\n');

    for t in tenants {
        let id = t.get("id").and_then(Value::as_str).unwrap_or("-");
        let name = t.get("name").and_then(Value::as_str).unwrap_or("-");
        let status = t.get("status").and_then(Value::as_str).unwrap_or("-");
        let retries = t
            .get("workflow_retry_count")
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        let message = t.get("status_message").and_then(Value::as_str).unwrap_or("");
        out.push_str(&format!(
            "{:<36} {:<16} {:<12} {:<10} {}\n",
            id, name, status, retries, message
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_list_renders_placeholder() {
        assert_eq!(render_tenants_table(&[]), "No tenants.");
    }

    #[test]
    fn renders_one_row_per_tenant() {
        let tenants = vec![json!({
            "id": "11111111-1111-1111-1111-111111111111",
            "name": "acme",
            "status": "ready",
            "workflow_retry_count": 0,
            "status_message": "workflow succeeded",
        })];
        let rendered = render_tenants_table(&tenants);
        assert!(rendered.contains("acme"));
        assert!(rendered.contains("ready"));
    }
}
