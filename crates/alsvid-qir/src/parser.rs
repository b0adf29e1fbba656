//! Parser for the LLVM-style textual IR subset.
//!
//! The grammar is the subset of LLVM assembly that QIR oracle modules use:
//! named type definitions, declarations, and function definitions whose
//! bodies consist of the instructions in [`crate::module::Op`]. Attribute
//! noise (`nuw`, `nsw`, `inbounds`, `align n`) is accepted and dropped.

use rustc_hash::FxHashMap;

use crate::error::{ParseError, ParseResult};
use crate::lexer::{tokenize, Token};
use crate::module::{BinaryOp, Block, Function, IcmpPred, Inst, LocalId, Module, Op, Operand};
use crate::types::{StructDef, Type};

/// Parse IR source text into a [`Module`].
pub fn parse(source: &str) -> ParseResult<Module> {
    let mut parser = Parser::new(source)?;
    parser.parse_module()
}

/// Parser state.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> ParseResult<Self> {
        let mut tokens = Vec::new();
        for result in tokenize(source) {
            match result {
                Ok(t) => tokens.push(t),
                Err((position, slice)) => {
                    return Err(ParseError::LexerError { position, slice });
                }
            }
        }
        Ok(Self { tokens, pos: 0 })
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek2(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(token)
    }

    fn expect(&mut self, expected: &Token) -> ParseResult<()> {
        let found = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof(expected.to_string()))?;
        if std::mem::discriminant(&found) != std::mem::discriminant(expected) {
            return Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected<T>(&mut self, expected: &str) -> ParseResult<T> {
        match self.advance() {
            Some(found) => Err(ParseError::UnexpectedToken {
                expected: expected.into(),
                found: found.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof(expected.into())),
        }
    }

    // ------------------------------------------------------------------
    // Top level
    // ------------------------------------------------------------------

    fn parse_module(&mut self) -> ParseResult<Module> {
        let mut module = Module::new();

        while !self.is_eof() {
            match self.peek() {
                Some(Token::LocalName(_)) => {
                    let def = self.parse_type_definition()?;
                    let name = def.name.clone();
                    if !module.types.define(def) {
                        return Err(ParseError::DuplicateType(name));
                    }
                }
                Some(Token::Declare) => {
                    let function = self.parse_declaration()?;
                    let name = function.name.clone();
                    if module.add_function(function).is_none() {
                        return Err(ParseError::DuplicateFunction(name));
                    }
                }
                Some(Token::Define) => {
                    let function = self.parse_definition()?;
                    let name = function.name.clone();
                    if module.add_function(function).is_none() {
                        return Err(ParseError::DuplicateFunction(name));
                    }
                }
                _ => return self.unexpected("type definition, declare, or define"),
            }
        }

        Ok(module)
    }

    /// `%Name = type opaque` or `%Name = type { fields }`.
    fn parse_type_definition(&mut self) -> ParseResult<StructDef> {
        let name = self.parse_local_name()?;
        self.expect(&Token::Assign)?;
        self.expect(&Token::Type)?;

        if self.consume(&Token::Opaque) {
            return Ok(StructDef {
                name,
                fields: vec![],
                opaque: true,
            });
        }

        self.expect(&Token::LBrace)?;
        let mut fields = Vec::new();
        if !self.check(&Token::RBrace) {
            fields.push(self.parse_type()?);
            while self.consume(&Token::Comma) {
                fields.push(self.parse_type()?);
            }
        }
        self.expect(&Token::RBrace)?;

        Ok(StructDef {
            name,
            fields,
            opaque: false,
        })
    }

    /// `declare <ty> @name(<types>)`.
    fn parse_declaration(&mut self) -> ParseResult<Function> {
        self.expect(&Token::Declare)?;
        let ret = self.parse_type()?;
        let name = self.parse_global_name()?;

        self.expect(&Token::LParen)?;
        let mut param_types = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                let ty = self.parse_type()?;
                // parameter names are optional in declarations
                if let Some(Token::LocalName(_)) = self.peek() {
                    self.advance();
                }
                param_types.push(ty);
                if !self.consume(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen)?;

        Ok(Function::new(name, param_types, ret))
    }

    /// `define <ty> @name(<params>) { blocks }`.
    fn parse_definition(&mut self) -> ParseResult<Function> {
        self.expect(&Token::Define)?;
        let ret = self.parse_type()?;
        let name = self.parse_global_name()?;

        self.expect(&Token::LParen)?;
        let mut param_types = Vec::new();
        let mut param_names = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                let ty = self.parse_type()?;
                let pname = match self.peek() {
                    Some(Token::LocalName(s)) => {
                        let s = s.clone();
                        self.advance();
                        Some(s)
                    }
                    _ => None,
                };
                param_types.push(ty);
                param_names.push(pname);
                if !self.consume(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen)?;

        let mut function = Function::new(name, param_types, ret);
        let mut locals = LocalScope::default();
        for (param, pname) in function.params.iter().zip(param_names) {
            let pname = pname.unwrap_or_else(|| param.id.0.to_string());
            locals.bind(pname, param.id);
        }

        self.expect(&Token::LBrace)?;
        self.parse_body(&mut function, &mut locals)?;
        self.expect(&Token::RBrace)?;

        if function.blocks.is_empty() {
            return Err(ParseError::EmptyBody(function.name));
        }
        Ok(function)
    }

    fn parse_body(&mut self, function: &mut Function, locals: &mut LocalScope) -> ParseResult<()> {
        // The entry block's label is optional; default it to "entry".
        let mut block = match self.peek() {
            Some(Token::LabelDef(label)) => {
                let label = label.clone();
                self.advance();
                Block::new(label)
            }
            _ => Block::new("entry"),
        };

        while !self.check(&Token::RBrace) {
            if let Some(Token::LabelDef(label)) = self.peek() {
                let label = label.clone();
                self.advance();
                function.blocks.push(std::mem::replace(&mut block, Block::new(label)));
                continue;
            }
            let inst = self.parse_instruction(function, locals)?;
            block.insts.push(inst);
        }
        function.blocks.push(block);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Instructions
    // ------------------------------------------------------------------

    fn parse_instruction(
        &mut self,
        function: &mut Function,
        locals: &mut LocalScope,
    ) -> ParseResult<Inst> {
        // `%r = <op>` or a void operation.
        if let Some(Token::LocalName(name)) = self.peek() {
            if self.peek2() == Some(&Token::Assign) {
                let name = name.clone();
                self.advance();
                self.advance();
                let result = locals.resolve(&name, function);
                let op = self.parse_value_op(function, locals)?;
                return Ok(Inst {
                    result: Some(result),
                    op,
                });
            }
        }

        let op = match self.peek() {
            Some(Token::Store) => self.parse_store(function, locals)?,
            Some(Token::Br) => self.parse_br(function, locals)?,
            Some(Token::Ret) => self.parse_ret(function, locals)?,
            Some(Token::Call | Token::Tail) => self.parse_call(function, locals)?,
            _ => return self.unexpected("instruction"),
        };
        Ok(Inst { result: None, op })
    }

    fn parse_value_op(
        &mut self,
        function: &mut Function,
        locals: &mut LocalScope,
    ) -> ParseResult<Op> {
        match self.peek() {
            Some(
                Token::And | Token::Or | Token::Xor | Token::Add | Token::Mul | Token::Srem,
            ) => self.parse_binary(function, locals),
            Some(Token::Icmp) => self.parse_icmp(function, locals),
            Some(Token::Select) => self.parse_select(function, locals),
            Some(Token::Call | Token::Tail) => self.parse_call(function, locals),
            Some(Token::Alloca) => self.parse_alloca(),
            Some(Token::Load) => self.parse_load(function, locals),
            Some(Token::BitCast) => self.parse_bitcast(function, locals),
            Some(Token::GetElementPtr) => self.parse_gep(function, locals),
            Some(Token::Phi) => self.parse_phi(function, locals),
            _ => self.unexpected("value-producing instruction"),
        }
    }

    fn parse_binary(
        &mut self,
        function: &mut Function,
        locals: &mut LocalScope,
    ) -> ParseResult<Op> {
        let op = match self.advance() {
            Some(Token::And) => BinaryOp::And,
            Some(Token::Or) => BinaryOp::Or,
            Some(Token::Xor) => BinaryOp::Xor,
            Some(Token::Add) => BinaryOp::Add,
            Some(Token::Mul) => BinaryOp::Mul,
            Some(Token::Srem) => BinaryOp::Srem,
            _ => unreachable!("caller checked the opcode token"),
        };
        self.skip_wrap_flags();
        let ty = self.parse_type()?;
        let lhs = self.parse_operand(&ty, function, locals)?;
        self.expect(&Token::Comma)?;
        let rhs = self.parse_operand(&ty, function, locals)?;
        Ok(Op::Binary { op, ty, lhs, rhs })
    }

    fn parse_icmp(
        &mut self,
        function: &mut Function,
        locals: &mut LocalScope,
    ) -> ParseResult<Op> {
        self.expect(&Token::Icmp)?;
        let pred = match self.advance() {
            Some(Token::Eq) => IcmpPred::Eq,
            Some(Token::Ne) => IcmpPred::Ne,
            Some(Token::Sgt) => IcmpPred::Sgt,
            Some(Token::Sge) => IcmpPred::Sge,
            Some(Token::Slt) => IcmpPred::Slt,
            Some(Token::Sle) => IcmpPred::Sle,
            Some(Token::Ugt) => IcmpPred::Ugt,
            Some(Token::Uge) => IcmpPred::Uge,
            Some(Token::Ult) => IcmpPred::Ult,
            Some(Token::Ule) => IcmpPred::Ule,
            Some(found) => {
                return Err(ParseError::UnexpectedToken {
                    expected: "icmp predicate".into(),
                    found: found.to_string(),
                });
            }
            None => return Err(ParseError::UnexpectedEof("icmp predicate".into())),
        };
        let ty = self.parse_type()?;
        let lhs = self.parse_operand(&ty, function, locals)?;
        self.expect(&Token::Comma)?;
        let rhs = self.parse_operand(&ty, function, locals)?;
        Ok(Op::Icmp { pred, ty, lhs, rhs })
    }

    fn parse_select(
        &mut self,
        function: &mut Function,
        locals: &mut LocalScope,
    ) -> ParseResult<Op> {
        self.expect(&Token::Select)?;
        let cond_ty = self.parse_type()?;
        let cond = self.parse_operand(&cond_ty, function, locals)?;
        self.expect(&Token::Comma)?;
        let ty = self.parse_type()?;
        let if_true = self.parse_operand(&ty, function, locals)?;
        self.expect(&Token::Comma)?;
        let ty2 = self.parse_type()?;
        let if_false = self.parse_operand(&ty2, function, locals)?;
        Ok(Op::Select {
            ty,
            cond,
            if_true,
            if_false,
        })
    }

    fn parse_call(
        &mut self,
        function: &mut Function,
        locals: &mut LocalScope,
    ) -> ParseResult<Op> {
        self.consume(&Token::Tail);
        self.expect(&Token::Call)?;
        let ret = self.parse_type()?;
        let callee = self.parse_global_name()?;

        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                let ty = self.parse_type()?;
                let value = self.parse_operand(&ty, function, locals)?;
                args.push((ty, value));
                if !self.consume(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen)?;
        Ok(Op::Call { ret, callee, args })
    }

    fn parse_alloca(&mut self) -> ParseResult<Op> {
        self.expect(&Token::Alloca)?;
        let ty = self.parse_type()?;
        self.skip_align();
        Ok(Op::Alloca { ty })
    }

    fn parse_load(
        &mut self,
        function: &mut Function,
        locals: &mut LocalScope,
    ) -> ParseResult<Op> {
        self.expect(&Token::Load)?;
        let ty = self.parse_type()?;
        self.expect(&Token::Comma)?;
        let ptr_ty = self.parse_type()?;
        let ptr = self.parse_operand(&ptr_ty, function, locals)?;
        self.skip_align();
        Ok(Op::Load { ty, ptr })
    }

    fn parse_store(
        &mut self,
        function: &mut Function,
        locals: &mut LocalScope,
    ) -> ParseResult<Op> {
        self.expect(&Token::Store)?;
        let ty = self.parse_type()?;
        let value = self.parse_operand(&ty, function, locals)?;
        self.expect(&Token::Comma)?;
        let ptr_ty = self.parse_type()?;
        let ptr = self.parse_operand(&ptr_ty, function, locals)?;
        self.skip_align();
        Ok(Op::Store { ty, value, ptr })
    }

    fn parse_bitcast(
        &mut self,
        function: &mut Function,
        locals: &mut LocalScope,
    ) -> ParseResult<Op> {
        self.expect(&Token::BitCast)?;
        let from = self.parse_type()?;
        let value = self.parse_operand(&from, function, locals)?;
        self.expect(&Token::To)?;
        let to = self.parse_type()?;
        Ok(Op::BitCast { from, value, to })
    }

    fn parse_gep(
        &mut self,
        function: &mut Function,
        locals: &mut LocalScope,
    ) -> ParseResult<Op> {
        self.expect(&Token::GetElementPtr)?;
        self.consume(&Token::Inbounds);
        let ty = self.parse_type()?;
        self.expect(&Token::Comma)?;
        let ptr_ty = self.parse_type()?;
        let ptr = self.parse_operand(&ptr_ty, function, locals)?;
        let mut indices = Vec::new();
        while self.consume(&Token::Comma) {
            let index_ty = self.parse_type()?;
            let index = self.parse_operand(&index_ty, function, locals)?;
            indices.push((index_ty, index));
        }
        Ok(Op::GetElementPtr { ty, ptr, indices })
    }

    fn parse_phi(
        &mut self,
        function: &mut Function,
        locals: &mut LocalScope,
    ) -> ParseResult<Op> {
        self.expect(&Token::Phi)?;
        let ty = self.parse_type()?;
        let mut incoming = Vec::new();
        loop {
            self.expect(&Token::LBracket)?;
            let value = self.parse_operand(&ty, function, locals)?;
            self.expect(&Token::Comma)?;
            let label = self.parse_local_name()?;
            self.expect(&Token::RBracket)?;
            incoming.push((value, label));
            if !self.consume(&Token::Comma) {
                break;
            }
        }
        Ok(Op::Phi { ty, incoming })
    }

    fn parse_br(
        &mut self,
        function: &mut Function,
        locals: &mut LocalScope,
    ) -> ParseResult<Op> {
        self.expect(&Token::Br)?;
        if self.consume(&Token::Label) {
            let target = self.parse_local_name()?;
            return Ok(Op::Br { target });
        }
        let cond_ty = self.parse_type()?;
        let cond = self.parse_operand(&cond_ty, function, locals)?;
        self.expect(&Token::Comma)?;
        self.expect(&Token::Label)?;
        let if_true = self.parse_local_name()?;
        self.expect(&Token::Comma)?;
        self.expect(&Token::Label)?;
        let if_false = self.parse_local_name()?;
        Ok(Op::CondBr {
            cond,
            if_true,
            if_false,
        })
    }

    fn parse_ret(
        &mut self,
        function: &mut Function,
        locals: &mut LocalScope,
    ) -> ParseResult<Op> {
        self.expect(&Token::Ret)?;
        if self.consume(&Token::Void) {
            return Ok(Op::Ret { value: None });
        }
        let ty = self.parse_type()?;
        let value = self.parse_operand(&ty, function, locals)?;
        Ok(Op::Ret {
            value: Some((ty, value)),
        })
    }

    // ------------------------------------------------------------------
    // Types and operands
    // ------------------------------------------------------------------

    fn parse_type(&mut self) -> ParseResult<Type> {
        let mut ty = match self.advance() {
            Some(Token::Void) => Type::Void,
            Some(Token::IntType(bits)) => Type::Int(bits),
            Some(Token::LocalName(name)) => Type::Named(name),
            Some(found) => {
                return Err(ParseError::UnexpectedToken {
                    expected: "type".into(),
                    found: found.to_string(),
                });
            }
            None => return Err(ParseError::UnexpectedEof("type".into())),
        };
        while self.consume(&Token::Star) {
            ty = ty.pointer_to();
        }
        Ok(ty)
    }

    fn parse_operand(
        &mut self,
        ty: &Type,
        function: &mut Function,
        locals: &mut LocalScope,
    ) -> ParseResult<Operand> {
        match self.peek() {
            Some(Token::LocalName(name)) => {
                let name = name.clone();
                self.advance();
                Ok(Operand::Local(locals.resolve(&name, function)))
            }
            Some(Token::GlobalName(name)) => {
                let name = name.clone();
                self.advance();
                Ok(Operand::Global(name))
            }
            Some(Token::Int(value)) => {
                let value = *value;
                self.advance();
                match ty {
                    Type::Int(bits) => Ok(Operand::Int {
                        bits: *bits,
                        value: value as u64,
                    }),
                    _ => Err(ParseError::UnsupportedOperand {
                        ty: ty.to_string(),
                        found: value.to_string(),
                    }),
                }
            }
            Some(Token::True) => {
                self.advance();
                Ok(Operand::Int { bits: 1, value: 1 })
            }
            Some(Token::False) => {
                self.advance();
                Ok(Operand::Int { bits: 1, value: 0 })
            }
            Some(Token::Null) => {
                self.advance();
                Ok(Operand::Null(ty.clone()))
            }
            Some(Token::PtrToInt) => self.parse_sizeof(),
            _ => self.unexpected("operand"),
        }
    }

    /// `ptrtoint (%T* getelementptr (%T, %T* null, i32 1) to i64)`
    fn parse_sizeof(&mut self) -> ParseResult<Operand> {
        self.expect(&Token::PtrToInt)?;
        self.expect(&Token::LParen)?;
        let _ptr_ty = self.parse_type()?;
        self.expect(&Token::GetElementPtr)?;
        self.expect(&Token::LParen)?;
        let elem_ty = self.parse_type()?;
        let name = match elem_ty {
            Type::Named(name) => name,
            other => {
                return Err(ParseError::UnsupportedOperand {
                    ty: other.to_string(),
                    found: "sizeof over a non-struct type".into(),
                });
            }
        };
        self.expect(&Token::Comma)?;
        let _ptr_ty = self.parse_type()?;
        self.expect(&Token::Null)?;
        self.expect(&Token::Comma)?;
        let _index_ty = self.parse_type()?;
        match self.advance() {
            Some(Token::Int(1)) => {}
            Some(found) => {
                return Err(ParseError::UnexpectedToken {
                    expected: "1".into(),
                    found: found.to_string(),
                });
            }
            None => return Err(ParseError::UnexpectedEof("1".into())),
        }
        self.expect(&Token::RParen)?;
        self.expect(&Token::To)?;
        self.expect(&Token::IntType(64))?;
        self.expect(&Token::RParen)?;
        Ok(Operand::SizeOf(name))
    }

    fn parse_local_name(&mut self) -> ParseResult<String> {
        match self.advance() {
            Some(Token::LocalName(s)) => Ok(s),
            Some(found) => Err(ParseError::UnexpectedToken {
                expected: "local name".into(),
                found: found.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof("local name".into())),
        }
    }

    fn parse_global_name(&mut self) -> ParseResult<String> {
        match self.advance() {
            Some(Token::GlobalName(s)) => Ok(s),
            Some(found) => Err(ParseError::UnexpectedToken {
                expected: "global name".into(),
                found: found.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof("global name".into())),
        }
    }

    fn skip_wrap_flags(&mut self) {
        while self.consume(&Token::Nuw) || self.consume(&Token::Nsw) {}
    }

    fn skip_align(&mut self) {
        let checkpoint = self.pos;
        if self.consume(&Token::Comma) {
            if self.consume(&Token::Align) {
                self.consume(&Token::Int(0));
                return;
            }
            self.pos = checkpoint;
        }
    }
}

/// Per-function mapping from textual local names to dense ids.
///
/// Forward references (phi arms) bind the id on first mention.
#[derive(Default)]
struct LocalScope {
    names: FxHashMap<String, LocalId>,
}

impl LocalScope {
    fn bind(&mut self, name: String, id: LocalId) {
        self.names.insert(name, id);
    }

    fn resolve(&mut self, name: &str, function: &mut Function) -> LocalId {
        if let Some(id) = self.names.get(name) {
            return *id;
        }
        let id = function.new_local();
        self.names.insert(name.to_string(), id);
        id
    }
}
