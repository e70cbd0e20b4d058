use std::path::Path;

use salvage_core::{EditRequest, RecoverySession, Token, TokenOrigin};

use super::{load_config, read_file};
use crate::{fail, OutputFormat};

pub(crate) fn cmd_replay(
    source_path: &Path,
    edits_path: Option<&Path>,
    config_path: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let source = read_file(source_path, output, quiet);

    let edits: Vec<EditRequest> = match edits_path {
        Some(path) => {
            let text = read_file(path, output, quiet);
            match serde_json::from_str(&text) {
                Ok(edits) => edits,
                Err(e) => {
                    let msg = format!("error parsing edits in '{}': {}", path.display(), e);
                    fail(&msg, output, quiet);
                }
            }
        }
        None => Vec::new(),
    };

    let session = RecoverySession {
        config: load_config(config_path, output, quiet).unwrap_or_default(),
        source: Some(source),
        edits,
        ..RecoverySession::default()
    };

    let tokens = match session.replay() {
        Ok(tokens) => tokens,
        Err(e) => {
            let msg = format!("error scanning '{}': {}", source_path.display(), e);
            fail(&msg, output, quiet);
        }
    };

    match output {
        OutputFormat::Text => {
            for token in &tokens {
                println!("{}", render_token(token));
            }
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&tokens) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(&format!("error serializing tokens: {}", e), output, quiet),
        },
    }
}

/// `offset kind text [origin]`, origin omitted for scanned tokens.
fn render_token(token: &Token) -> String {
    let mut line = format!("{} {:?}", token.span.start, token.kind);
    if !token.text.is_empty() {
        line.push(' ');
        line.push_str(&token.text);
    }
    match token.origin {
        TokenOrigin::Source => {}
        TokenOrigin::Inserted => line.push_str(" [inserted]"),
        TokenOrigin::Replaced => line.push_str(" [replaced]"),
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvage_core::{Span, TokenKind};

    #[test]
    fn scanned_token_has_no_marker() {
        let token = Token {
            kind: TokenKind::Identifier,
            span: Span::new(4, 7),
            text: "foo".into(),
            origin: TokenOrigin::Source,
        };
        assert_eq!(render_token(&token), "4 Identifier foo");
    }

    #[test]
    fn synthetic_tokens_are_marked() {
        let inserted = Token::synthetic(TokenKind::Identifier, Span::empty_at(3), TokenOrigin::Inserted);
        assert_eq!(render_token(&inserted), "3 Identifier $missing$ [inserted]");
        let replaced = Token::synthetic(TokenKind::Semicolon, Span::empty_at(9), TokenOrigin::Replaced);
        assert_eq!(render_token(&replaced), "9 Semicolon [replaced]");
    }
}
