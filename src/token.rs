//! Token types shared by the block and inline tokenizers (spec §3.1).

/// A block-level token. Every kind except the ones explicitly declared
/// lexeme-less below carries `lexeme.len() >= 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockToken {
    pub kind: BlockTokenKind,
    pub lexeme: String,
}

impl BlockToken {
    pub fn new(kind: BlockTokenKind, lexeme: impl Into<String>) -> Self {
        let token = Self {
            kind,
            lexeme: lexeme.into(),
        };
        debug_assert!(
            token.kind.is_lexeme_less() || !token.lexeme.is_empty(),
            "block token {:?} must carry a non-empty lexeme",
            token.kind
        );
        token
    }

    pub fn lexeme_less(kind: BlockTokenKind) -> Self {
        debug_assert!(kind.is_lexeme_less(), "{kind:?} is not a lexeme-less kind");
        Self {
            kind,
            lexeme: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTokenKind {
    Text,
    Pound,
    Indent,
    Newline,
    Whitespace,
    Colon,
    RuleStar,
    RuleUnderline,
    RuleDash,
    RuleDashWithWhitespace,
    RuleEquals,
    BacktickFence,
    TildeFence,
    LSquareBracket,
    RSquareBracket,
    LAngleBracket,
    RAngleBracket,
    LParen,
    RParen,
    SingleQuote,
    DoubleQuote,
    RAngleBracketBlockquote,
    /// Synthetic token injected by the ContainerBlockParser to signal a lazy
    /// continuation boundary. Never produced by the BlockTokenizer itself.
    Close,
}

impl BlockTokenKind {
    pub fn is_lexeme_less(self) -> bool {
        matches!(
            self,
            BlockTokenKind::Newline
                | BlockTokenKind::Indent
                | BlockTokenKind::RuleStar
                | BlockTokenKind::RuleUnderline
                | BlockTokenKind::RuleDashWithWhitespace
                | BlockTokenKind::Close
        )
    }

    /// Line-starting tokens that interrupt an in-progress paragraph
    /// (spec §4.4 "Paragraph scanning").
    pub fn interrupts_paragraph(self) -> bool {
        matches!(
            self,
            BlockTokenKind::Newline
                | BlockTokenKind::Pound
                | BlockTokenKind::RuleStar
                | BlockTokenKind::RuleUnderline
                | BlockTokenKind::RuleDash
                | BlockTokenKind::RuleDashWithWhitespace
                | BlockTokenKind::RuleEquals
                | BlockTokenKind::BacktickFence
                | BlockTokenKind::TildeFence
        )
    }
}

/// Flanking classification carried by a star delimiter run (spec §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarContext {
    pub run_len: u16,
}

/// Flanking classification carried by an underscore delimiter run. Unlike
/// stars, underscores additionally track the punctuation on either side so
/// the inline parser can veto intraword matches (spec §3.1, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnderscoreContext {
    pub run_len: u16,
    pub preceded_by_punct: bool,
    pub followed_by_punct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineTokenKind {
    Text,
    Whitespace,
    Newline,
    Backtick,
    EntityReference,
    DecimalCharacterReference,
    HexadecimalCharacterReference,
    AbsoluteUri,
    Email,
    LSquareBracket,
    RSquareBracket,
    LAngleBracket,
    RAngleBracket,
    LParen,
    RParen,
    SingleQuote,
    DoubleQuote,
    ExclamationMark,
    LDelimStar(StarContext),
    RDelimStar(StarContext),
    LrDelimStar(StarContext),
    LDelimUnderscore(UnderscoreContext),
    RDelimUnderscore(UnderscoreContext),
    LrDelimUnderscore(UnderscoreContext),
}

impl InlineTokenKind {
    pub fn star_run_len(self) -> Option<u16> {
        match self {
            InlineTokenKind::LDelimStar(c)
            | InlineTokenKind::RDelimStar(c)
            | InlineTokenKind::LrDelimStar(c) => Some(c.run_len),
            _ => None,
        }
    }

    pub fn underscore_context(self) -> Option<UnderscoreContext> {
        match self {
            InlineTokenKind::LDelimUnderscore(c)
            | InlineTokenKind::RDelimUnderscore(c)
            | InlineTokenKind::LrDelimUnderscore(c) => Some(c),
            _ => None,
        }
    }

    pub fn can_open_star(self) -> bool {
        matches!(
            self,
            InlineTokenKind::LDelimStar(_) | InlineTokenKind::LrDelimStar(_)
        )
    }

    pub fn can_close_star(self) -> bool {
        matches!(
            self,
            InlineTokenKind::RDelimStar(_) | InlineTokenKind::LrDelimStar(_)
        )
    }

    pub fn can_open_underscore(self) -> bool {
        matches!(
            self,
            InlineTokenKind::LDelimUnderscore(_) | InlineTokenKind::LrDelimUnderscore(_)
        )
    }

    pub fn can_close_underscore(self) -> bool {
        matches!(
            self,
            InlineTokenKind::RDelimUnderscore(_) | InlineTokenKind::LrDelimUnderscore(_)
        )
    }

    pub fn is_both_flanking_star(self) -> bool {
        matches!(self, InlineTokenKind::LrDelimStar(_))
    }

    pub fn is_both_flanking_underscore(self) -> bool {
        matches!(self, InlineTokenKind::LrDelimUnderscore(_))
    }
}

/// An inline-level token. Delimiter-run kinds carry their classification in
/// `kind` itself; `lexeme` still holds the single delimiter character so the
/// text-resolution step (spec §4.6) can fall back to it verbatim when a run
/// never matches anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineToken {
    pub kind: InlineTokenKind,
    pub lexeme: String,
}

impl InlineToken {
    pub fn new(kind: InlineTokenKind, lexeme: impl Into<String>) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
        }
    }
}
