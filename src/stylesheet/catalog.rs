use std::collections::HashMap;

use crate::language::MarkerStyle;

/// Marker descriptors in declaration order, indexed by marker string.
#[derive(Debug, Clone, Default)]
pub struct MarkerCatalog {
    styles: Vec<MarkerStyle>,
    index: HashMap<String, usize>,
}

impl MarkerCatalog {
    pub fn new() -> MarkerCatalog {
        MarkerCatalog::default()
    }

    pub fn len(&self) -> usize {
        self.styles
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles
            .is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarkerStyle> {
        self.styles
            .iter()
    }

    pub fn get(&self, marker: &str) -> Option<&MarkerStyle> {
        self.index
            .get(marker)
            .map(|&i| &self.styles[i])
    }

    /// Look a marker up, synthesizing (and keeping) an unknown-style
    /// descriptor when the stylesheet never declared it.
    pub fn get_or_add(&mut self, marker: &str) -> &MarkerStyle {
        if !self
            .index
            .contains_key(marker)
        {
            self.add(MarkerStyle::unknown(marker));
        }
        let i = self.index[marker];
        &self.styles[i]
    }

    /// Insert a descriptor, replacing any existing entry for the same
    /// marker in place.
    pub fn add(&mut self, style: MarkerStyle) {
        match self
            .index
            .get(&style.marker)
        {
            Some(&i) => self.styles[i] = style,
            None => {
                self.index
                    .insert(
                        style
                            .marker
                            .clone(),
                        self.styles
                            .len(),
                    );
                self.styles
                    .push(style);
            }
        }
    }

    /// Union of two catalogs; entries from `other` override ours.
    pub fn merge(&mut self, other: &MarkerCatalog) {
        for style in other.iter() {
            self.add(style.clone());
        }
    }

    /// Delete a marker and, when present, its end-marker counterpart.
    pub fn remove(&mut self, marker: &str) {
        let end = match self.get(marker) {
            Some(style) => style
                .end_marker
                .clone()
                .or_else(|| Some(format!("{}*", marker))),
            None => None,
        };

        self.remove_one(marker);
        if let Some(end) = end {
            self.remove_one(&end);
        }
    }

    fn remove_one(&mut self, marker: &str) {
        if let Some(i) = self
            .index
            .remove(marker)
        {
            self.styles
                .remove(i);
            for slot in self
                .index
                .values_mut()
            {
                if *slot > i {
                    *slot -= 1;
                }
            }
        }
    }
}
