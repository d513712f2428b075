use domain::TreeNode;

/// Indented text view of a tree walk
pub fn render_outline(lines: &[(usize, TreeNode)]) -> String {
    let mut out = String::new();
    for (depth, node) in lines {
        out.push_str(&"  ".repeat(*depth));
        if node.is_error() {
            out.push_str("! ");
        }
        out.push_str(&node.label());
        if let Some(description) = node.description() {
            out.push_str(&format!(" [{}]", description));
        }
        out.push('\n');
    }
    out
}
