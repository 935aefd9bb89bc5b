// Rank-aware stack deciding where a paragraph-level marker may occur.

use crate::language::MarkerStyle;

#[derive(Debug, Default)]
pub struct ParaStack {
    stack: Vec<(String, u32)>,
}

impl ParaStack {
    pub fn new() -> ParaStack {
        ParaStack::default()
    }

    pub fn clear(&mut self) {
        self.stack
            .clear();
    }

    /// Try to place a marker. A marker with no placement constraint is
    /// always accepted; otherwise the innermost element it may occur
    /// under is located, and the marker is accepted if that element is
    /// on top or the element directly above it ranks no deeper than the
    /// incoming marker (rank 0 constrains nothing). Acceptance
    /// truncates the stack to the parent and pushes the marker.
    pub fn push(&mut self, style: &MarkerStyle) -> bool {
        if style
            .occurs_under
            .is_empty()
        {
            self.stack
                .push((
                    style
                        .marker
                        .clone(),
                    style.rank,
                ));
            return true;
        }

        let pos = self
            .stack
            .iter()
            .rposition(|(marker, _)| {
                style
                    .occurs_under
                    .contains(marker)
            });
        let pos = match pos {
            Some(pos) => pos,
            None => return false,
        };

        let accepted = pos + 1
            == self
                .stack
                .len()
            || {
                let above = self.stack[pos + 1].1;
                above == 0 || style.rank == 0 || above <= style.rank
            };
        if !accepted {
            return false;
        }

        self.stack
            .truncate(pos + 1);
        self.stack
            .push((
                style
                    .marker
                    .clone(),
                style.rank,
            ));
        true
    }
}
