//! Parenthesized S-expression values.
//!
//! IMAP's universal structured-payload format: a `(...)` list whose items
//! are strings, binary literals, nested lists, or the distinguished `NIL`
//! atom.

use tokio::io::AsyncRead;

use crate::parser::lexer::Lexer;
use crate::Result;

/// One node of a parsed S-expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sexp {
    /// A quoted string or atom.
    String(String),
    /// A length-prefixed literal. Binary-safe, never text.
    Bytes(Vec<u8>),
    /// A nested parenthesized list.
    List(Vec<Sexp>),
    /// The `NIL` atom.
    Nil,
}

impl Sexp {
    /// Returns the string content, or `None` for any other variant.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Variant name for error messages.
    #[must_use]
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Nil => "NIL",
        }
    }
}

impl<R: AsyncRead + Unpin> Lexer<R> {
    /// Reads one parenthesized list and returns its items.
    ///
    /// An atom spelled `NIL` becomes [`Sexp::Nil`]; everywhere else the
    /// text survives as-is. Zero items is legal. Nesting is handled with
    /// an explicit stack rather than recursion, which async fns cannot do
    /// without boxing.
    pub async fn read_sexp(&mut self) -> Result<Vec<Sexp>> {
        self.expect("(").await?;
        let mut stack: Vec<Vec<Sexp>> = vec![Vec::new()];
        loop {
            let c = self.peek_byte().await?;
            match c {
                b')' => {
                    self.read_byte().await?;
                    let done = match stack.pop() {
                        Some(items) => items,
                        None => return Err(self.error("unbalanced )")),
                    };
                    match stack.last_mut() {
                        None => return Ok(done),
                        Some(parent) => parent.push(Sexp::List(done)),
                    }
                    self.item_separator().await?;
                }
                b'(' => {
                    self.read_byte().await?;
                    stack.push(Vec::new());
                }
                b'"' => {
                    let s = self.read_quoted().await?;
                    self.push_item(&mut stack, Sexp::String(s))?;
                    self.item_separator().await?;
                }
                b'{' => {
                    let bytes = self.read_literal().await?;
                    self.push_item(&mut stack, Sexp::Bytes(bytes))?;
                    self.item_separator().await?;
                }
                _ => {
                    let atom = self.read_atom().await?;
                    let item = if atom == "NIL" { Sexp::Nil } else { Sexp::String(atom) };
                    self.push_item(&mut stack, item)?;
                    self.item_separator().await?;
                }
            }
        }
    }

    /// Reads a parenthesized list and asserts every item is a string.
    pub async fn read_paren_string_list(&mut self) -> Result<Vec<String>> {
        let items = self.read_sexp().await?;
        let mut strings = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            match item {
                Sexp::String(s) => strings.push(s),
                other => {
                    return Err(self.error(format!(
                        "list element {i} is {}, not a string",
                        other.variant_name()
                    )))
                }
            }
        }
        Ok(strings)
    }

    fn push_item(&self, stack: &mut [Vec<Sexp>], item: Sexp) -> Result<()> {
        match stack.last_mut() {
            Some(top) => {
                top.push(item);
                Ok(())
            }
            None => Err(self.error("item outside any list")),
        }
    }

    /// Between items, one space is consumed; any other byte is put back.
    async fn item_separator(&mut self) -> Result<()> {
        let c = self.read_byte().await?;
        if c != b' ' {
            self.unread_byte(c);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexer(input: &[u8]) -> Lexer<&[u8]> {
        Lexer::new(input)
    }

    fn s(text: &str) -> Sexp {
        Sexp::String(text.to_string())
    }

    #[tokio::test]
    async fn empty_list() {
        let mut lx = lexer(b"()");
        assert_eq!(lx.read_sexp().await.unwrap(), Vec::<Sexp>::new());
    }

    #[tokio::test]
    async fn literal_then_atom() {
        let mut lx = lexer(b"({5}\r\n01234 abc)");
        assert_eq!(
            lx.read_sexp().await.unwrap(),
            vec![Sexp::Bytes(b"01234".to_vec()), s("abc")]
        );
    }

    #[tokio::test]
    async fn literal_directly_before_close() {
        let mut lx = lexer(b"({2}\r\nAB)");
        assert_eq!(
            lx.read_sexp().await.unwrap(),
            vec![Sexp::Bytes(b"AB".to_vec())]
        );
    }

    #[tokio::test]
    async fn nil_inside_list_is_nil_variant() {
        let mut lx = lexer(b"(NIL \"NIL\" NILS)");
        assert_eq!(
            lx.read_sexp().await.unwrap(),
            vec![Sexp::Nil, s("NIL"), s("NILS")]
        );
    }

    #[tokio::test]
    async fn standalone_atom_nil_stays_text() {
        // Outside an S-exp the atom reader has no NIL special case.
        let mut lx = lexer(b"NIL ");
        assert_eq!(lx.read_atom().await.unwrap(), "NIL");
    }

    #[tokio::test]
    async fn nested_lists() {
        let mut lx = lexer(b"(a (b c) ((d)))");
        assert_eq!(
            lx.read_sexp().await.unwrap(),
            vec![
                s("a"),
                Sexp::List(vec![s("b"), s("c")]),
                Sexp::List(vec![Sexp::List(vec![s("d")])]),
            ]
        );
    }

    #[tokio::test]
    async fn paren_string_list() {
        let mut lx = lexer(b"(\\HasNoChildren \\Foo)");
        assert_eq!(
            lx.read_paren_string_list().await.unwrap(),
            vec!["\\HasNoChildren".to_string(), "\\Foo".to_string()]
        );
    }

    #[tokio::test]
    async fn paren_string_list_names_offending_element() {
        let mut lx = lexer(b"(ok NIL)");
        let err = lx.read_paren_string_list().await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("element 1"), "{message}");
        assert!(message.contains("NIL"), "{message}");
    }

    #[tokio::test]
    async fn envelope_from_the_corpus() {
        let input: &[u8] = b"(ENVELOPE (\"Fri, 14 Oct 2011 13:51:22 -0700\" \
\"Re: [PATCH 1/1] added code to export CAP_LAST_CAP in /proc/sys/kernel modeled after ngroups_max\" \
((\"Andrew Morton\" NIL \"akpm\" \"linux-foundation.org\")) \
((NIL NIL \"linux-kernel-owner\" \"vger.kernel.org\")) \
((\"Andrew Morton\" NIL \"akpm\" \"linux-foundation.org\")) \
((\"Dan Ballard\" NIL \"dan\" \"mindstab.net\")) \
((\"Ingo Molnar\" NIL \"mingo\" \"elte.hu\") (\"Lennart Poettering\" NIL \"lennart\" \"poettering.net\") \
(\"Kay Sievers\" NIL \"kay.sievers\" \"vrfy.org\") (NIL NIL \"linux-kernel\" \"vger.kernel.org\")) \
NIL \"<1318460194-31983-1-git-send-email-dan@mindstab.net>\" \
\"<20111014135122.4bb95565.akpm@linux-foundation.org>\") \
FLAGS () INTERNALDATE \"14-Oct-2011 20:51:30 +0000\" RFC822.SIZE 4623)";

        let mut lx = lexer(input);
        let items = lx.read_sexp().await.unwrap();
        assert_eq!(items.len(), 8);
        assert_eq!(items[0], s("ENVELOPE"));

        let Sexp::List(envelope) = &items[1] else {
            panic!("envelope is {}", items[1].variant_name());
        };
        assert_eq!(envelope.len(), 10);
        assert_eq!(
            envelope[0],
            s("Fri, 14 Oct 2011 13:51:22 -0700")
        );
        // cc has four entries, bcc is NIL.
        let Sexp::List(cc) = &envelope[6] else {
            panic!("cc is {}", envelope[6].variant_name());
        };
        assert_eq!(cc.len(), 4);
        assert_eq!(envelope[7], Sexp::Nil);

        assert_eq!(items[2], s("FLAGS"));
        assert_eq!(items[3], Sexp::List(vec![]));
        assert_eq!(items[4], s("INTERNALDATE"));
        assert_eq!(items[5], s("14-Oct-2011 20:51:30 +0000"));
        assert_eq!(items[6], s("RFC822.SIZE"));
        assert_eq!(items[7], s("4623"));
    }
}
