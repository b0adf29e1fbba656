//! Lexer for the LLVM-style textual IR subset.

use logos::Logos;

/// Tokens of the IR subset.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r";[^\n]*")]
pub enum Token {
    // Top-level keywords
    #[token("define")]
    Define,

    #[token("declare")]
    Declare,

    #[token("type")]
    Type,

    #[token("opaque")]
    Opaque,

    // Instruction keywords
    #[token("and")]
    And,

    #[token("or")]
    Or,

    #[token("xor")]
    Xor,

    #[token("add")]
    Add,

    #[token("mul")]
    Mul,

    #[token("srem")]
    Srem,

    #[token("icmp")]
    Icmp,

    #[token("select")]
    Select,

    #[token("br")]
    Br,

    #[token("ret")]
    Ret,

    #[token("call")]
    Call,

    #[token("tail")]
    Tail,

    #[token("alloca")]
    Alloca,

    #[token("load")]
    Load,

    #[token("store")]
    Store,

    #[token("bitcast")]
    BitCast,

    #[token("getelementptr")]
    GetElementPtr,

    #[token("phi")]
    Phi,

    #[token("ptrtoint")]
    PtrToInt,

    // Comparison predicates
    #[token("eq")]
    Eq,

    #[token("ne")]
    Ne,

    #[token("sgt")]
    Sgt,

    #[token("sge")]
    Sge,

    #[token("slt")]
    Slt,

    #[token("sle")]
    Sle,

    #[token("ugt")]
    Ugt,

    #[token("uge")]
    Uge,

    #[token("ult")]
    Ult,

    #[token("ule")]
    Ule,

    // Type and operand keywords
    #[token("void")]
    Void,

    #[token("null")]
    Null,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("to")]
    To,

    #[token("label")]
    Label,

    // Accepted-and-ignored attribute noise
    #[token("nuw")]
    Nuw,

    #[token("nsw")]
    Nsw,

    #[token("inbounds")]
    Inbounds,

    #[token("align")]
    Align,

    // Literals and names
    #[regex(r"i[0-9]+", |lex| lex.slice()[1..].parse::<u32>().ok(), priority = 3)]
    IntType(u32),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r"%[-a-zA-Z$._0-9]+", |lex| lex.slice()[1..].to_string())]
    LocalName(String),

    #[regex(r"@[-a-zA-Z$._0-9]+", |lex| lex.slice()[1..].to_string())]
    GlobalName(String),

    #[regex(r"[a-zA-Z$._][-a-zA-Z$._0-9]*:", |lex| {
        let s = lex.slice();
        s[..s.len() - 1].to_string()
    })]
    LabelDef(String),

    // Punctuation
    #[token("=")]
    Assign,

    #[token(",")]
    Comma,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("*")]
    Star,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Define => write!(f, "define"),
            Token::Declare => write!(f, "declare"),
            Token::Type => write!(f, "type"),
            Token::Opaque => write!(f, "opaque"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Xor => write!(f, "xor"),
            Token::Add => write!(f, "add"),
            Token::Mul => write!(f, "mul"),
            Token::Srem => write!(f, "srem"),
            Token::Icmp => write!(f, "icmp"),
            Token::Select => write!(f, "select"),
            Token::Br => write!(f, "br"),
            Token::Ret => write!(f, "ret"),
            Token::Call => write!(f, "call"),
            Token::Tail => write!(f, "tail"),
            Token::Alloca => write!(f, "alloca"),
            Token::Load => write!(f, "load"),
            Token::Store => write!(f, "store"),
            Token::BitCast => write!(f, "bitcast"),
            Token::GetElementPtr => write!(f, "getelementptr"),
            Token::Phi => write!(f, "phi"),
            Token::PtrToInt => write!(f, "ptrtoint"),
            Token::Eq => write!(f, "eq"),
            Token::Ne => write!(f, "ne"),
            Token::Sgt => write!(f, "sgt"),
            Token::Sge => write!(f, "sge"),
            Token::Slt => write!(f, "slt"),
            Token::Sle => write!(f, "sle"),
            Token::Ugt => write!(f, "ugt"),
            Token::Uge => write!(f, "uge"),
            Token::Ult => write!(f, "ult"),
            Token::Ule => write!(f, "ule"),
            Token::Void => write!(f, "void"),
            Token::Null => write!(f, "null"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::To => write!(f, "to"),
            Token::Label => write!(f, "label"),
            Token::Nuw => write!(f, "nuw"),
            Token::Nsw => write!(f, "nsw"),
            Token::Inbounds => write!(f, "inbounds"),
            Token::Align => write!(f, "align"),
            Token::IntType(bits) => write!(f, "i{bits}"),
            Token::Int(v) => write!(f, "{v}"),
            Token::LocalName(s) => write!(f, "%{s}"),
            Token::GlobalName(s) => write!(f, "@{s}"),
            Token::LabelDef(s) => write!(f, "{s}:"),
            Token::Assign => write!(f, "="),
            Token::Comma => write!(f, ","),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Star => write!(f, "*"),
        }
    }
}

/// Tokenize IR source text.
pub fn tokenize(source: &str) -> Vec<Result<Token, (usize, String)>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push(Ok(token)),
            Err(()) => {
                let span = lexer.span();
                tokens.push(Err((span.start, source[span].to_string())));
            }
        }
    }

    tokens
}
