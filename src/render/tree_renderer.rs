use std::fmt::Write as _;

use colored::Colorize;
use supports_color::Stream;

use crate::ext::PathExt;
use crate::status::StatusTag;
use crate::tree::{NodeId, NodeKind, TreeModel};

const PLACEHOLDER_TEXT: &str = "(empty)";
const INDENT: &str = "  ";

/// Draws the materialized part of a [`TreeModel`] as an indented listing.
///
/// Collapsed directories show only their own line. Without color support the
/// status is spelled out after the name instead.
pub struct TreeRenderer {
    colored: bool,
}

impl TreeRenderer {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    /// Colors are used unless disabled or stdout can't show them.
    pub fn for_stdout(no_color: bool) -> Self {
        Self::new(!no_color && supports_color::on(Stream::Stdout).is_some())
    }

    pub fn render(&self, model: &TreeModel) -> String {
        let mut output = String::new();
        if model.is_empty() {
            return output;
        }
        for &root in model.roots() {
            let label = model.path(root).project_display();
            self.render_node(model, root, label, 0, &mut output);
        }
        output
    }

    fn render_node(
        &self,
        model: &TreeModel,
        id: NodeId,
        label: String,
        depth: usize,
        output: &mut String,
    ) {
        let node = model.node(id);
        let marker = match node.kind() {
            NodeKind::Directory if node.is_expanded() => "▾ ",
            NodeKind::Directory => "▸ ",
            NodeKind::File | NodeKind::Placeholder => "  ",
        };
        let text = match node.kind() {
            NodeKind::Placeholder => self.paint_placeholder(),
            _ => self.paint(label, node.tag()),
        };
        let _ = writeln!(output, "{}{}{}", INDENT.repeat(depth), marker, text);

        if !node.is_expanded() {
            return;
        }
        for &child in node.children() {
            let label = match model.node(child).kind() {
                NodeKind::Placeholder => String::new(),
                _ => file_name(model, child),
            };
            self.render_node(model, child, label, depth + 1, output);
        }
    }

    fn paint(&self, label: String, tag: Option<StatusTag>) -> String {
        let Some(tag) = tag else {
            return label;
        };
        if !self.colored {
            return format!("{label} [{tag}]");
        }
        match tag {
            StatusTag::Added => label.green().to_string(),
            StatusTag::Modified => label.red().to_string(),
            StatusTag::MergeConflict => label.truecolor(255, 165, 0).to_string(),
            StatusTag::Untracked => label.truecolor(139, 0, 0).to_string(),
            StatusTag::Ignored => label.bright_black().to_string(),
        }
    }

    fn paint_placeholder(&self) -> String {
        if self.colored {
            PLACEHOLDER_TEXT.bright_black().to_string()
        } else {
            PLACEHOLDER_TEXT.to_string()
        }
    }
}

fn file_name(model: &TreeModel, id: NodeId) -> String {
    let path = model.path(id);
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
