use std::fmt::Write as _;
use std::path::Path;

use salvage_core::{Ast, Diagnostic, NodeFlags, NodeKind, RecoverySession};

use super::{load_config, read_file};
use crate::{fail, OutputFormat};

pub(crate) fn cmd_propagate(
    session_path: &Path,
    config_path: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let text = read_file(session_path, output, quiet);
    let mut session = match RecoverySession::from_json(&text) {
        Ok(session) => session,
        Err(e) => {
            let msg = format!("error parsing session '{}': {}", session_path.display(), e);
            fail(&msg, output, quiet);
        }
    };
    if let Some(config) = load_config(config_path, output, quiet) {
        session.config = config;
    }

    let outcome = match session.propagate() {
        Ok(outcome) => outcome,
        Err(e) => {
            let msg = format!("error propagating '{}': {}", session_path.display(), e);
            fail(&msg, output, quiet);
        }
    };

    match output {
        OutputFormat::Text => {
            print!("{}", render_tree(&outcome.tree));
            for diagnostic in &outcome.diagnostics {
                println!("{}", render_diagnostic(diagnostic));
            }
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&outcome) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(&format!("error serializing result: {}", e), output, quiet),
        },
    }
}

/// One node per line, indented by depth, recovered nodes marked.
fn render_tree(ast: &Ast) -> String {
    let mut out = String::new();
    let mut stack: Vec<_> = ast.root().map(|root| (root, 0)).into_iter().collect();
    while let Some((id, depth)) = stack.pop() {
        let node = ast.node(id);
        let _ = write!(
            out,
            "{:indent$}{} {:?} {}..{}",
            "",
            id,
            node.kind.shape(),
            node.span.start,
            node.span.end,
            indent = depth * 2
        );
        if let NodeKind::SimpleName { identifier } = &node.kind {
            let _ = write!(out, " {}", identifier);
        }
        for (flag, label) in [
            (NodeFlags::RECOVERED, "recovered"),
            (NodeFlags::MALFORMED, "malformed"),
        ] {
            if node.flags.contains(flag) {
                let _ = write!(out, " [{}]", label);
            }
        }
        out.push('\n');
        for child in ast.children(id).into_iter().rev() {
            stack.push((child, depth + 1));
        }
    }
    out
}

fn render_diagnostic(diagnostic: &Diagnostic) -> String {
    format!(
        "diagnostic {:?} {}..={}{}",
        diagnostic.category,
        diagnostic.start,
        diagnostic.end,
        if diagnostic.used { " [used]" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvage_core::{ProblemCategory, Span};

    #[test]
    fn tree_lines_follow_preorder() {
        let mut ast = Ast::new();
        let name = ast
            .alloc(
                NodeKind::SimpleName {
                    identifier: "x".into(),
                },
                Span::new(2, 3),
            )
            .unwrap();
        let stmt = ast
            .alloc(NodeKind::ExpressionStatement { expression: name }, Span::new(2, 4))
            .unwrap();
        let block = ast
            .alloc(
                NodeKind::Block {
                    statements: vec![stmt],
                },
                Span::new(0, 6),
            )
            .unwrap();
        ast.set_root(block).unwrap();
        ast.add_flags(stmt, NodeFlags::RECOVERED);

        assert_eq!(
            render_tree(&ast),
            "#2 Block 0..6\n  #1 ExpressionStatement 2..4 [recovered]\n    #0 SimpleName 2..3 x\n"
        );
    }

    #[test]
    fn used_diagnostics_are_marked() {
        let mut diagnostic = Diagnostic::new(ProblemCategory::ParsingErrorDeleteToken, 7, 7);
        assert_eq!(render_diagnostic(&diagnostic), "diagnostic ParsingErrorDeleteToken 7..=7");
        diagnostic.used = true;
        assert!(render_diagnostic(&diagnostic).ends_with("[used]"));
    }
}
