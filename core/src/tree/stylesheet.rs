use super::TreeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub priority: Option<String>,
}

/// One CSS rule: a style rule with declarations, or a grouping rule with
/// nested rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssRule {
    pub prelude: String,
    pub declarations: Vec<Declaration>,
    pub rules: Vec<CssRule>,
    grouping: bool,
}

impl CssRule {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let Some(open) = text.find('{') else {
            // Statement rules such as @import keep their text verbatim.
            return Self {
                prelude: text.trim_end_matches(';').to_string(),
                declarations: Vec::new(),
                rules: Vec::new(),
                grouping: false,
            };
        };
        let prelude = text[..open].trim().to_string();
        let body = text[open + 1..].trim_end();
        let body = body.strip_suffix('}').unwrap_or(body);

        if body.contains('{') {
            Self {
                prelude,
                declarations: Vec::new(),
                rules: split_rules(body).iter().map(|r| CssRule::parse(r)).collect(),
                grouping: true,
            }
        } else {
            Self {
                prelude,
                declarations: parse_declarations(body),
                rules: Vec::new(),
                grouping: false,
            }
        }
    }

    pub fn css_text(&self) -> String {
        if self.grouping {
            let inner: Vec<String> = self.rules.iter().map(CssRule::css_text).collect();
            return format!("{} {{ {} }}", self.prelude, inner.join(" "));
        }
        if self.declarations.is_empty() && !self.prelude.starts_with('@') {
            return format!("{} {{ }}", self.prelude);
        }
        if self.declarations.is_empty() {
            return format!("{};", self.prelude);
        }
        let decls: Vec<String> = self
            .declarations
            .iter()
            .map(|d| match &d.priority {
                Some(p) if !p.is_empty() => format!("{}: {} !{};", d.property, d.value, p),
                _ => format!("{}: {};", d.property, d.value),
            })
            .collect();
        format!("{} {{ {} }}", self.prelude, decls.join(" "))
    }

    fn set_property(&mut self, property: &str, value: &str, priority: Option<&str>) {
        let priority = priority.filter(|p| !p.is_empty()).map(str::to_string);
        match self.declarations.iter_mut().find(|d| d.property == property) {
            Some(d) => {
                d.value = value.to_string();
                d.priority = priority;
            }
            None => self.declarations.push(Declaration {
                property: property.to_string(),
                value: value.to_string(),
                priority,
            }),
        }
    }

    fn remove_property(&mut self, property: &str) {
        self.declarations.retain(|d| d.property != property);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleRuleOp {
    /// Missing index inserts at position 0; an index past the end is clamped.
    Insert {
        rule: String,
        index: Option<Vec<usize>>,
    },
    Delete {
        index: Vec<usize>,
    },
    Replace(String),
    SetProperty {
        index: Vec<usize>,
        property: String,
        value: Option<String>,
        priority: Option<String>,
    },
    RemoveProperty {
        index: Vec<usize>,
        property: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSheet {
    pub rules: Vec<CssRule>,
}

impl StyleSheet {
    pub fn from_css_text(text: &str) -> Self {
        Self {
            rules: split_rules(text).iter().map(|r| CssRule::parse(r)).collect(),
        }
    }

    pub fn css_text(&self) -> String {
        self.rules
            .iter()
            .map(CssRule::css_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn rule_texts(&self) -> Vec<String> {
        self.rules.iter().map(CssRule::css_text).collect()
    }

    pub fn apply(&mut self, op: &StyleRuleOp) -> Result<(), TreeError> {
        match op {
            StyleRuleOp::Insert { rule, index } => {
                let path = index.clone().unwrap_or_else(|| vec![0]);
                let (last, parents) = path
                    .split_last()
                    .ok_or_else(|| TreeError::IndexOutOfRange(path.clone()))?;
                let list = self.rule_list_mut(parents, &path)?;
                let at = (*last).min(list.len());
                list.insert(at, CssRule::parse(rule));
            }
            StyleRuleOp::Delete { index } => {
                let (last, parents) = index
                    .split_last()
                    .ok_or_else(|| TreeError::IndexOutOfRange(index.clone()))?;
                let list = self.rule_list_mut(parents, index)?;
                if *last >= list.len() {
                    return Err(TreeError::IndexOutOfRange(index.clone()));
                }
                list.remove(*last);
            }
            StyleRuleOp::Replace(text) => {
                *self = Self::from_css_text(text);
            }
            StyleRuleOp::SetProperty {
                index,
                property,
                value,
                priority,
            } => {
                let rule = self.rule_mut(index)?;
                match value {
                    Some(v) => rule.set_property(property, v, priority.as_deref()),
                    None => rule.remove_property(property),
                }
            }
            StyleRuleOp::RemoveProperty { index, property } => {
                self.rule_mut(index)?.remove_property(property);
            }
        }
        Ok(())
    }

    fn rule_list_mut(
        &mut self,
        parents: &[usize],
        full: &[usize],
    ) -> Result<&mut Vec<CssRule>, TreeError> {
        let mut list = &mut self.rules;
        for &i in parents {
            list = &mut list
                .get_mut(i)
                .ok_or_else(|| TreeError::IndexOutOfRange(full.to_vec()))?
                .rules;
        }
        Ok(list)
    }

    fn rule_mut(&mut self, index: &[usize]) -> Result<&mut CssRule, TreeError> {
        let (last, parents) = index
            .split_last()
            .ok_or_else(|| TreeError::IndexOutOfRange(index.to_vec()))?;
        self.rule_list_mut(parents, index)?
            .get_mut(*last)
            .ok_or_else(|| TreeError::IndexOutOfRange(index.to_vec()))
    }
}

/// Splits a block of CSS into top-level rules by brace depth.
fn split_rules(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in text.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let rule = text[start..=i].trim();
                    if !rule.is_empty() {
                        out.push(rule.to_string());
                    }
                    start = i + 1;
                }
            }
            ';' if depth == 0 => {
                let rule = text[start..=i].trim();
                if !rule.is_empty() {
                    out.push(rule.to_string());
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
    out
}

fn parse_declarations(body: &str) -> Vec<Declaration> {
    body.split(';')
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim();
            if property.is_empty() {
                return None;
            }
            let value = value.trim();
            let (value, priority) = match value.split_once('!') {
                Some((v, p)) => (v.trim(), Some(p.trim().to_string())),
                None => (value, None),
            };
            Some(Declaration {
                property: property.to_string(),
                value: value.to_string(),
                priority,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_rules_and_renders_back() {
        let sheet = StyleSheet::from_css_text(
            "a { color: red; } @media (min-width: 1px) { p { margin: 0 !important; } }",
        );
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[1].rules.len(), 1);
        assert_eq!(
            sheet.rule_texts(),
            vec![
                "a { color: red; }".to_string(),
                "@media (min-width: 1px) { p { margin: 0 !important; } }".to_string(),
            ]
        );
    }

    #[test]
    fn insert_and_delete_follow_index_paths() {
        let mut sheet = StyleSheet::from_css_text("@media print { a { color: red; } }");
        sheet
            .apply(&StyleRuleOp::Insert {
                rule: "b { top: 0; }".into(),
                index: Some(vec![0, 1]),
            })
            .unwrap();
        assert_eq!(sheet.rules[0].rules.len(), 2);

        sheet
            .apply(&StyleRuleOp::Insert {
                rule: "i { top: 1px; }".into(),
                index: Some(vec![99]),
            })
            .unwrap();
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[1].prelude, "i");

        let err = sheet.apply(&StyleRuleOp::Delete { index: vec![5] });
        assert_eq!(err, Err(TreeError::IndexOutOfRange(vec![5])));

        sheet.apply(&StyleRuleOp::Delete { index: vec![0, 0] }).unwrap();
        assert_eq!(sheet.rules[0].rules[0].prelude, "b");
    }

    #[test]
    fn declarations_can_be_set_and_removed() {
        let mut sheet = StyleSheet::from_css_text("a { color: red; }");
        sheet
            .apply(&StyleRuleOp::SetProperty {
                index: vec![0],
                property: "color".into(),
                value: Some("blue".into()),
                priority: Some("important".into()),
            })
            .unwrap();
        assert_eq!(sheet.css_text(), "a { color: blue !important; }");

        sheet
            .apply(&StyleRuleOp::RemoveProperty {
                index: vec![0],
                property: "color".into(),
            })
            .unwrap();
        assert_eq!(sheet.css_text(), "a { }");
    }
}
