use treecore::Actor;

/// Renders an actor tree as an indented outline, one actor per line.
/// Skipped actors are marked; the main use is the `tree` CLI command
/// and debugging output.
pub fn render(actor: &dyn Actor) -> String {
    let mut out = String::new();
    render_into(actor, 0, &mut out);
    out
}

fn render_into(actor: &dyn Actor, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(&actor.describe());
    if actor.is_skipped() {
        out.push_str(" (skipped)");
    }
    out.push('\n');
    for child in actor.children() {
        render_into(child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{Sequence, Trigger};
    use crate::flow::Flow;

    #[test]
    fn renders_nested_structure_with_indentation() {
        let flow = Flow::new("demo").push(Box::new(
            Trigger::new("side").push(Box::new(Sequence::new("inner"))),
        ));
        let rendered = render(&flow);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("demo [control.flow"));
        assert!(lines[1].starts_with("  side [control.trigger"));
        assert!(lines[2].starts_with("    inner [control.sequence"));
    }

    #[test]
    fn marks_skipped_actors() {
        let flow = Flow::new("demo").push(Box::new(Sequence::new("off").skipped()));
        let rendered = render(&flow);
        assert!(rendered.contains("off [control.sequence: control] (skipped)"));
    }
}
