use std::fmt::{Display, Write};

/// Joins displayable items with a separator.
pub trait Join<Item: Display>: Iterator<Item = Item> {
    fn join(&mut self, sep: &str) -> String {
        let mut result = String::new();
        if let Some(first) = self.next() {
            let _ = write!(&mut result, "{first}");
            self.for_each(|item| {
                result.push_str(sep);
                let _ = write!(&mut result, "{item}");
            });
        }
        result
    }
}

impl<T: ?Sized, Item: Display> Join<Item> for T where T: Iterator<Item = Item> {}

/// Indents every line of the displayed value.
pub trait Indent: Display {
    fn indent(&self, indent: usize) -> String {
        self.to_string()
            .split('\n')
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{}{line}", " ".repeat(indent))
                }
            })
            .join("\n")
    }
}

impl<T: Display> Indent for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        assert_eq!(["a", "b", "c"].iter().join(", "), "a, b, c");
        assert_eq!(Vec::<u8>::new().iter().join(", "), "");
    }

    #[test]
    fn test_indent() {
        assert_eq!("a\n\nb".indent(2), "  a\n\n  b");
    }
}
