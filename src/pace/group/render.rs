//! Canonical source rendering of grouped phrases. Grouping the rendering
//! again yields groups of the same shape.

use super::*;

fn joined<I: Iterator<Item = String>>(parts: I, sep: &str) -> String {
    parts.collect::<Vec<_>>().join(sep)
}

fn render_phrases(phrases: &[Phrase], sep: &str) -> String {
    joined(phrases.iter().map(|p| p.render()), sep)
}

fn render_row(row: &Row) -> String {
    joined(row.iter().map(|slot| render_phrases(slot, ". ")), ", ")
}

fn render_rows(rows: &[Row]) -> String {
    joined(rows.iter().map(render_row), "; ")
}

impl Phrase {
    pub fn render(&self) -> String {
        joined(self.items.iter().map(|item| match item {
            Item::Token(token) => token.render(),
            Item::Group(group) => group.render(),
        }), " ")
    }
}

impl Snippet {
    pub fn render(&self) -> String {
        render_phrases(&self.phrases, "\n")
    }
}

impl Group {
    pub fn render(&self) -> String {
        match self {
            Group::TupleOrParen(tuple) => match tuple.shape {
                TupleShape::Null => "()".to_string(),
                TupleShape::Grid => {
                    if tuple.rows.len() == 1 {
                        format!("(;{})", render_rows(&tuple.rows))
                    } else {
                        format!("({})", render_rows(&tuple.rows))
                    }
                },
                // A trailing empty slot renders as "a, " and keeps its comma
                _ => format!("({})", render_rows(&tuple.rows).trim_end()),
            },
            Group::FuncOrStruct(func) => match &func.content {
                FuncOrStructContent::Struct(fields) => {
                    let rendered = render_phrases(fields, ", ");
                    if fields.len() == 1 {
                        format!("{{{},}}", rendered)
                    } else {
                        format!("{{{}}}", rendered)
                    }
                },
                FuncOrStructContent::Function(literal) => {
                    let body = render_phrases(&literal.body, ". ");
                    if let Some(params) = &literal.params {
                        let params = joined(params.iter().map(|p| match &p.type_tag {
                            Some(tag) => format!("{} <:{}>", p.name.text, tag.text),
                            None => p.name.text.clone(),
                        }), ", ");
                        let ret = match &literal.ret_type {
                            Some(ret) => format!(" <:{}>", ret.text),
                            None => String::new(),
                        };
                        format!("{{[{}]{} {}}}", params, ret, body)
                    } else if func.doubled {
                        format!("{{{{{}}}}}", body)
                    } else {
                        format!("{{{}}}", body)
                    }
                },
            },
            Group::Block(block) => format!("[{}]", render_phrases(&block.body, ". ")),
            Group::Frame(frame) => format!(
                "([{}] {})",
                joined(frame.keys.iter().map(|k| k.text.clone()), ", "),
                render_rows(&frame.rows)
            ),
            Group::Load(load) => format!("load {}", joined(load.paths.iter().map(|p| p.text.clone()), ", ")),
            Group::FromImport(import) => format!(
                "from {} import {}",
                import.path.text,
                joined(import.names.iter().map(|n| n.text.clone()), ", ")
            ),
            Group::TypeTag(tag) => format!("<:{}>", tag.text),
        }
    }
}
