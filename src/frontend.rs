//! Frontend: convert text IR to a `Module`.
//!
//! The format is line-oriented but whitespace-insensitive:
//!
//! ```plain
//! file f0 = "/home/user/proj", "main.c"
//! global @fmt
//! declare @scanf
//!
//! func @main(%argc) {
//! entry:
//!   %x = alloca !f0:4:7
//!   %n = call @scanf(@fmt, %x) !f0:5:3
//!   %v = load %x !f0:6:7
//!   %c = icmp.slt %v, 10 !f0:6:9
//!   br_if %c, then, done !f0:6:3
//! then:
//!   br done
//! done:
//!   %p = phi [entry: %v], [then: 0]
//!   ret %p
//! }
//! ```
//!
//! Values and blocks may be referenced before they are defined (phis
//! need this); functions, globals and files may be declared anywhere
//! in the module.

use crate::errors::FrontendError;
use crate::ir::*;
use anyhow::{anyhow, bail, Result};
use fxhash::FxHashMap;
use log::{debug, trace};
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "frontend/ir.pest"]
struct IrParser;

/// Module-level names, resolved before any body is built.
#[derive(Default)]
struct Names {
    files: FxHashMap<String, SourceFile>,
    funcs: FxHashMap<String, Func>,
    globals: FxHashMap<String, Global>,
}

fn next<'i>(pairs: &mut Pairs<'i, Rule>) -> Result<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| anyhow!("malformed parse tree: missing node"))
}

/// Strips the `%` or `@` sigil from a name.
fn sigil_name(pair: &Pair<Rule>) -> String {
    pair.as_str()[1..].to_owned()
}

pub fn text_to_ir(text: &str) -> Result<Module> {
    let mut pairs = IrParser::parse(Rule::module, text)
        .map_err(|e| FrontendError::Syntax(e.to_string()))?;
    let items = next(&mut pairs)?.into_inner();

    let mut module = Module::empty();
    let mut names = Names::default();
    let mut bodies = vec![];

    for item in items {
        trace!("text IR item: {:?} {:?}", item.as_rule(), item.as_span());
        match item.as_rule() {
            Rule::file_decl => {
                let mut inner = item.into_inner();
                let name = next(&mut inner)?.as_str().to_owned();
                let directory = next(&mut next(&mut inner)?.into_inner())?.as_str();
                let file = next(&mut next(&mut inner)?.into_inner())?.as_str();
                let id = module.debug.intern_file(directory, file);
                if names.files.insert(name.clone(), id).is_some() {
                    return Err(FrontendError::Duplicate { kind: "file", name }.into());
                }
            }
            Rule::global_decl => {
                let name = sigil_name(&next(&mut item.into_inner())?);
                check_unique(&names, &name)?;
                let global = module.globals.push(GlobalData { name: name.clone() });
                names.globals.insert(name, global);
            }
            Rule::declare_decl => {
                let name = sigil_name(&next(&mut item.into_inner())?);
                check_unique(&names, &name)?;
                let func = module.funcs.push(FuncDecl::Import(name.clone()));
                names.funcs.insert(name, func);
            }
            Rule::func_def => {
                let name = sigil_name(&next(&mut item.clone().into_inner())?);
                check_unique(&names, &name)?;
                let func = module
                    .funcs
                    .push(FuncDecl::Body(name.clone(), FunctionBody::default()));
                names.funcs.insert(name, func);
                bodies.push((func, item));
            }
            Rule::EOI => {}
            rule => bail!("unexpected top-level item {:?}", rule),
        }
    }

    for (func, pair) in bodies {
        let name = module.funcs[func].name().to_owned();
        let body = FunctionBuilder::build(&names, &mut module.debug, &name, pair)?;
        debug!(
            "parsed @{}: {} blocks, {} values",
            name,
            body.blocks.len(),
            body.values.len()
        );
        if let Some(slot) = module.funcs[func].body_mut() {
            *slot = body;
        }
    }

    module.validate()?;
    Ok(module)
}

fn check_unique(names: &Names, name: &str) -> Result<()> {
    if names.funcs.contains_key(name) || names.globals.contains_key(name) {
        return Err(FrontendError::Duplicate {
            kind: "symbol",
            name: format!("@{}", name),
        }
        .into());
    }
    Ok(())
}

struct FunctionBuilder<'a> {
    names: &'a Names,
    debug: &'a mut Debug,
    func_name: &'a str,
    body: FunctionBody,
    values: FxHashMap<String, Value>,
    blocks: FxHashMap<String, Block>,
}

impl<'a> FunctionBuilder<'a> {
    fn build(
        names: &'a Names,
        debug: &'a mut Debug,
        func_name: &'a str,
        pair: Pair<Rule>,
    ) -> Result<FunctionBody> {
        let mut inner = pair.into_inner();
        let _name = next(&mut inner)?;
        let params = next(&mut inner)?.into_inner().collect::<Vec<_>>();

        let mut builder = FunctionBuilder {
            names,
            debug,
            func_name,
            body: FunctionBody::new(params.len()),
            values: FxHashMap::default(),
            blocks: FxHashMap::default(),
        };
        for (param, value) in params.iter().zip(builder.body.params.clone()) {
            builder.define_name(&sigil_name(param), value)?;
        }

        let blocks = inner.collect::<Vec<_>>();
        let mut block_ids = vec![];
        for (i, block_pair) in blocks.iter().enumerate() {
            let label = next(&mut block_pair.clone().into_inner())?.as_str();
            let block = if i == 0 {
                let entry = builder.body.entry;
                builder.body.blocks[entry].name = label.to_owned();
                entry
            } else {
                builder.body.add_block(label)
            };
            if builder.blocks.insert(label.to_owned(), block).is_some() {
                return Err(FrontendError::Duplicate {
                    kind: "block",
                    name: label.to_owned(),
                }
                .into());
            }
            block_ids.push(block);
        }

        // Give every named result a placeholder first, so that uses
        // may precede definitions.
        for block_pair in &blocks {
            for inst in block_pair.clone().into_inner() {
                if inst.as_rule() != Rule::inst {
                    continue;
                }
                let first = next(&mut inst.into_inner())?;
                if first.as_rule() == Rule::local {
                    let value = builder.body.add_value(ValueDef::Undef);
                    builder.define_name(&sigil_name(&first), value)?;
                }
            }
        }

        for (block_pair, block) in blocks.into_iter().zip(block_ids) {
            for child in block_pair.into_inner().skip(1) {
                match child.as_rule() {
                    Rule::inst => builder.inst(block, child)?,
                    Rule::terminator => builder.terminator(block, child)?,
                    rule => bail!("unexpected {:?} in block", rule),
                }
            }
        }

        Ok(builder.body)
    }

    fn define_name(&mut self, name: &str, value: Value) -> Result<()> {
        if self.values.insert(name.to_owned(), value).is_some() {
            return Err(FrontendError::Duplicate {
                kind: "value",
                name: format!("%{}", name),
            }
            .into());
        }
        self.body.set_name(value, name);
        Ok(())
    }

    fn inst(&mut self, block: Block, pair: Pair<Rule>) -> Result<()> {
        let mut inner = pair.into_inner();
        let first = next(&mut inner)?;
        let (result, op) = if first.as_rule() == Rule::local {
            (Some(sigil_name(&first)), next(&mut inner)?)
        } else {
            (None, first)
        };

        let def = self.op(op)?;
        let value = match result {
            Some(name) => {
                if let ValueDef::Store { .. } = def {
                    return Err(FrontendError::NamedStore(name).into());
                }
                let value = self.values[&name];
                self.body.values[value] = def;
                value
            }
            None => self.body.add_value(def),
        };
        self.body.append_to_block(block, value);

        if let Some(loc) = inner.next() {
            let loc = self.loc(loc)?;
            self.body.set_loc(value, loc);
        }
        Ok(())
    }

    fn op(&mut self, pair: Pair<Rule>) -> Result<ValueDef> {
        let rule = pair.as_rule();
        let mut inner = pair.into_inner();
        match rule {
            Rule::alloca_op => Ok(ValueDef::Alloca),
            Rule::load_op => {
                let _kw = next(&mut inner)?;
                Ok(ValueDef::Load(self.operand(next(&mut inner)?)?))
            }
            Rule::store_op => {
                let _kw = next(&mut inner)?;
                let value = self.operand(next(&mut inner)?)?;
                let addr = self.operand(next(&mut inner)?)?;
                Ok(ValueDef::Store { value, addr })
            }
            Rule::call_op => {
                let _kw = next(&mut inner)?;
                let name = sigil_name(&next(&mut inner)?);
                let callee = match self.names.funcs.get(&name) {
                    Some(&callee) => callee,
                    None => return Err(FrontendError::UndefinedFunction(name).into()),
                };
                let args = match inner.next() {
                    Some(list) => self.operand_list(list)?,
                    None => vec![],
                };
                Ok(ValueDef::Call { callee, args })
            }
            Rule::phi_op => {
                let _kw = next(&mut inner)?;
                let mut incoming = vec![];
                for pair in inner {
                    let mut pair = pair.into_inner();
                    let block = self.block_ref(next(&mut pair)?.as_str())?;
                    let value = self.operand(next(&mut pair)?)?;
                    incoming.push((block, value));
                }
                Ok(ValueDef::Phi(incoming))
            }
            Rule::generic_op => {
                let opcode = next(&mut inner)?.as_str().to_owned();
                let args = match inner.next() {
                    Some(list) => self.operand_list(list)?,
                    None => vec![],
                };
                Ok(ValueDef::Operator(opcode, args))
            }
            rule => bail!("unexpected operator {:?}", rule),
        }
    }

    fn operand_list(&mut self, pair: Pair<Rule>) -> Result<Vec<Value>> {
        pair.into_inner().map(|pair| self.operand(pair)).collect()
    }

    fn operand(&mut self, pair: Pair<Rule>) -> Result<Value> {
        match pair.as_rule() {
            Rule::local => {
                let name = sigil_name(&pair);
                match self.values.get(&name) {
                    Some(&value) => Ok(value),
                    None => Err(FrontendError::UndefinedValue {
                        name,
                        func: self.func_name.to_owned(),
                    }
                    .into()),
                }
            }
            Rule::global => {
                let name = sigil_name(&pair);
                match self.names.globals.get(&name) {
                    Some(&global) => Ok(self.body.global_value(global)),
                    None => Err(FrontendError::UndefinedGlobal(name).into()),
                }
            }
            Rule::integer => {
                let value = pair
                    .as_str()
                    .parse::<i64>()
                    .map_err(|_| FrontendError::BadInteger(pair.as_str().to_owned()))?;
                Ok(self.body.add_value(ValueDef::Const(value)))
            }
            Rule::undef => Ok(self.body.add_value(ValueDef::Undef)),
            rule => bail!("unexpected operand {:?}", rule),
        }
    }

    fn block_ref(&self, label: &str) -> Result<Block> {
        match self.blocks.get(label) {
            Some(&block) => Ok(block),
            None => Err(FrontendError::UndefinedBlock {
                name: label.to_owned(),
                func: self.func_name.to_owned(),
            }
            .into()),
        }
    }

    fn terminator(&mut self, block: Block, pair: Pair<Rule>) -> Result<()> {
        let mut inner = pair.into_inner();
        let term = next(&mut inner)?;
        let rule = term.as_rule();
        let mut parts = term.into_inner();
        let terminator = match rule {
            Rule::br_if_term => {
                let _kw = next(&mut parts)?;
                let cond = self.operand(next(&mut parts)?)?;
                let if_true = self.block_ref(next(&mut parts)?.as_str())?;
                let if_false = self.block_ref(next(&mut parts)?.as_str())?;
                Terminator::CondBr {
                    cond,
                    if_true,
                    if_false,
                }
            }
            Rule::br_term => {
                let _kw = next(&mut parts)?;
                let target = self.block_ref(next(&mut parts)?.as_str())?;
                Terminator::Br { target }
            }
            Rule::ret_term => {
                let _kw = next(&mut parts)?;
                let value = match parts.next() {
                    Some(pair) => Some(self.operand(pair)?),
                    None => None,
                };
                Terminator::Return { value }
            }
            Rule::unreachable_term => Terminator::Unreachable,
            rule => bail!("unexpected terminator {:?}", rule),
        };
        self.body.end_block(block, terminator);

        if let Some(loc) = inner.next() {
            let loc = self.loc(loc)?;
            self.body.blocks[block].terminator_loc = Some(loc);
        }
        Ok(())
    }

    fn loc(&mut self, pair: Pair<Rule>) -> Result<SourceLoc> {
        let mut inner = pair.into_inner();
        let file_name = next(&mut inner)?.as_str();
        let file = match self.names.files.get(file_name) {
            Some(&file) => file,
            None => return Err(FrontendError::UndefinedFile(file_name.to_owned()).into()),
        };
        let mut number = || -> Result<u32> {
            let text = next(&mut inner)?.as_str();
            Ok(text
                .parse::<u32>()
                .map_err(|_| FrontendError::BadInteger(text.to_owned()))?)
        };
        let line = number()?;
        let col = number()?;
        Ok(self.debug.intern_loc(file, line, col))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entity::EntityVec;

    fn body_count(funcs: &EntityVec<Func, FuncDecl>) -> usize {
        funcs.values().filter(|decl| decl.body().is_some()).count()
    }

    const SAMPLE: &str = r#"
; Reads a number and branches on it.
file f0 = "/home/user/proj", "main.c"
global @fmt
declare @scanf

func @main(%argc) {
entry:
  %x = alloca !f0:4:7
  %n = call @scanf(@fmt, %x) !f0:5:3
  %v = load %x !f0:6:7
  %c = icmp.slt %v, 10 !f0:6:9
  br_if %c, then, done !f0:6:3
then:
  br done
done:
  %p = phi [entry: %v], [then: 0]
  ret %p
}
"#;

    #[test]
    fn parse_sample() {
        let _ = env_logger::try_init();
        let module = Module::from_text(SAMPLE).unwrap();
        log::debug!("parsed:\n{}", module.display());

        assert_eq!(module.funcs.len(), 2);
        assert_eq!(body_count(&module.funcs), 1);
        let main = module.func_by_name("main").unwrap();
        let body = module.funcs[main].body().unwrap();
        assert_eq!(body.blocks.len(), 3);
        assert_eq!(body.blocks[body.entry].name, "entry");

        let x = body.value_by_name("x").unwrap();
        assert_eq!(body.values[x], ValueDef::Alloca);
        let loc = body.value_locs[x].unwrap();
        let loc = module.debug.location(loc).unwrap();
        assert_eq!(loc.to_string(), "/home/user/proj/main.c:4:7");

        let p = body.value_by_name("p").unwrap();
        let v = body.value_by_name("v").unwrap();
        match &body.values[p] {
            ValueDef::Phi(incoming) => {
                assert_eq!(incoming.len(), 2);
                assert_eq!(incoming[0], (body.entry, v));
                assert_eq!(body.values[incoming[1].1], ValueDef::Const(0));
            }
            def => panic!("unexpected def {:?}", def),
        }

        let done = body.block_by_name("done").unwrap();
        assert_eq!(body.blocks[done].preds.len(), 2);
        assert!(body.blocks[body.entry].terminator_loc.is_some());
    }

    #[test]
    fn forward_references() {
        let module = Module::from_text(
            r#"
func @count(%n) {
entry:
  br loop
loop:
  %i = phi [entry: 0], [loop: %next]
  %next = add %i, 1
  %more = icmp.slt %next, %n
  br_if %more, loop, exit
exit:
  ret %i
}
"#,
        )
        .unwrap();
        let body = module.funcs[module.func_by_name("count").unwrap()]
            .body()
            .unwrap();
        let next = body.value_by_name("next").unwrap();
        match &body.values[next] {
            ValueDef::Operator(opcode, args) => {
                assert_eq!(opcode, "add");
                assert_eq!(args[0], body.value_by_name("i").unwrap());
            }
            def => panic!("unexpected def {:?}", def),
        }
    }

    #[test]
    fn nullary_operator_before_next_definition() {
        let _ = env_logger::try_init();
        let module = Module::from_text(
            r#"
func @f() {
entry:
  %z = rdtsc
  %y = add %z, 1
  ret %y
}
"#,
        )
        .unwrap();
        let body = module.funcs[module.func_by_name("f").unwrap()]
            .body()
            .unwrap();
        let z = body.value_by_name("z").unwrap();
        let y = body.value_by_name("y").unwrap();
        assert_eq!(body.values[z], ValueDef::Operator("rdtsc".to_owned(), vec![]));
        match &body.values[y] {
            ValueDef::Operator(opcode, args) => {
                assert_eq!(opcode, "add");
                assert_eq!(args.len(), 2);
                assert_eq!(args[0], z);
                assert_eq!(body.values[args[1]], ValueDef::Const(1));
            }
            def => panic!("unexpected def {:?}", def),
        }
    }

    #[test]
    fn errors() {
        let cases: &[(&str, &str)] = &[
            ("func @f() {\nentry:\n  ret %nope\n}", "undefined value `%nope`"),
            ("func @f() {\nentry:\n  br nowhere\n}", "undefined block `nowhere`"),
            ("func @f() {\nentry:\n  call @g()\n  ret\n}", "undefined function `@g`"),
            ("func @f() {\nentry:\n  %x = load @g\n  ret\n}", "undefined global `@g`"),
            ("func @f() {\nentry:\n  %x = alloca !f9:1:1\n  ret\n}", "undefined source file `f9`"),
            ("global @a\nglobal @a", "duplicate definition of symbol `@a`"),
            ("func @f(%a, %a) {\nentry:\n  ret\n}", "duplicate definition of value `%a`"),
            (
                "func @f() {\nentry:\n  ret\nentry:\n  ret\n}",
                "duplicate definition of block `entry`",
            ),
            ("func @f(%p) {\nentry:\n  %s = store %p, %p\n  ret\n}", "store cannot define `%s`"),
            ("func @f() {\nentry:\n  %x = add 99999999999999999999\n  ret\n}", "out of range"),
            ("func @f() {\nentry:\n  %x = alloca\n}", "syntax error"),
        ];
        for &(text, expected) in cases {
            let err = Module::from_text(text).unwrap_err();
            let message = err.to_string();
            assert!(
                message.contains(expected),
                "expected `{}` in error `{}`",
                expected,
                message
            );
        }
    }

    #[test]
    fn invalid_phi_is_rejected() {
        let err = Module::from_text(
            "func @f(%a) {\nentry:\n  br next\nnext:\n  %p = phi [next: %a]\n  ret %p\n}",
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("not a predecessor"));
    }
}
