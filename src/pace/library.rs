//! Standard prelude: host implemented functions put in front of every
//! module.

use crate::pace::ast::{Style, TableId};
use crate::pace::eval::{ForeignError, Interpreter, Value};
use crate::pace::input_source::{CoreError, SrcSpan};
use crate::pace::loader::ForeignDecl;
use crate::pace::parser::overload::{FnImpl, Implementation};
use crate::pace::parser::symbol_table::Symbols;
use crate::pace::tokens::Scope;
use crate::pace::types::BType;

pub const PRELUDE_MODULE: &str = "prelude";

fn failed<S: ToString>(message: S) -> ForeignError {
    ForeignError::Failed(message.to_string())
}

fn describe(args: &[Value]) -> String {
    args.iter().map(|v| v.btype().to_string()).collect::<Vec<_>>().join(",")
}

fn int_pair(args: &[Value]) -> Result<(i64, i64), ForeignError> {
    match args {
        [a, b] => match (a.as_int(), b.as_int()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(failed(format!("expected (int,int), got ({})", describe(args)))),
        },
        _ => Err(failed(format!("expected two arguments, got {}", args.len()))),
    }
}

fn num_pair(args: &[Value]) -> Result<(f64, f64), ForeignError> {
    match args {
        [a, b] => match (a.as_num(), b.as_num()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(failed(format!("expected (num,num), got ({})", describe(args)))),
        },
        _ => Err(failed(format!("expected two arguments, got {}", args.len()))),
    }
}

fn overflow() -> ForeignError {
    failed("integer overflow")
}

fn add_int(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value, ForeignError> {
    let (a, b) = int_pair(&args)?;
    a.checked_add(b).map(Value::Int).ok_or_else(overflow)
}

fn sub_int(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value, ForeignError> {
    let (a, b) = int_pair(&args)?;
    a.checked_sub(b).map(Value::Int).ok_or_else(overflow)
}

fn mul_int(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value, ForeignError> {
    let (a, b) = int_pair(&args)?;
    a.checked_mul(b).map(Value::Int).ok_or_else(overflow)
}

fn div_int(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value, ForeignError> {
    let (a, b) = int_pair(&args)?;
    if b == 0 {
        return Err(failed("division by zero"));
    }
    a.checked_div(b).map(Value::Int).ok_or_else(overflow)
}

fn add_num(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value, ForeignError> {
    let (a, b) = num_pair(&args)?;
    Ok(Value::Num(a + b))
}

fn sub_num(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value, ForeignError> {
    let (a, b) = num_pair(&args)?;
    Ok(Value::Num(a - b))
}

fn mul_num(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value, ForeignError> {
    let (a, b) = num_pair(&args)?;
    Ok(Value::Num(a * b))
}

fn div_num(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value, ForeignError> {
    let (a, b) = num_pair(&args)?;
    if b == 0.0 {
        return Err(failed("division by zero"));
    }
    Ok(Value::Num(a / b))
}

fn concat(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value, ForeignError> {
    match args.as_slice() {
        [a, b] => match (a.as_text(), b.as_text()) {
            (Some(a), Some(b)) => Ok(Value::Text(format!("{}{}", a, b))),
            _ => Err(failed(format!("expected (txt,txt), got ({})", describe(&args)))),
        },
        _ => Err(failed(format!("expected two arguments, got {}", args.len()))),
    }
}

fn less(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value, ForeignError> {
    let (a, b) = num_pair(&args)?;
    Ok(Value::Bool(a < b))
}

fn greater(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value, ForeignError> {
    let (a, b) = num_pair(&args)?;
    Ok(Value::Bool(a > b))
}

fn equals(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value, ForeignError> {
    match args.as_slice() {
        [a, b] => Ok(Value::Bool(a == b)),
        _ => Err(failed(format!("expected two arguments, got {}", args.len()))),
    }
}

fn not(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value, ForeignError> {
    match args.as_slice() {
        [v] => v.as_bool().map(|v| Value::Bool(!v))
            .ok_or_else(|| failed(format!("expected (bool), got ({})", describe(&args)))),
        _ => Err(failed(format!("expected one argument, got {}", args.len()))),
    }
}

fn count(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value, ForeignError> {
    let counted = match args.as_slice() {
        [Value::Tuple(values)] => values.len(),
        [Value::Struct(fields)] => fields.len(),
        [Value::Text(text)] => text.chars().count(),
        _ => return Err(failed(format!("cannot count a value of type ({})", describe(&args)))),
    };
    Ok(Value::Int(counted as i64))
}

/// Runs a branch handed to a control flow helper: zero-argument callables
/// are called, anything else is the result itself.
fn force(interp: &mut Interpreter<'_>, branch: Value) -> Result<Value, ForeignError> {
    if interp.is_thunk(&branch) {
        Ok(interp.call_value(branch, Vec::new())?)
    } else if branch.is_callable() {
        Err(failed("a branch must take no arguments"))
    } else {
        Ok(branch)
    }
}

fn if_true_if_false(interp: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value, ForeignError> {
    let mut args = args.into_iter();
    match (args.next().and_then(|c| c.as_bool()), args.next(), args.next()) {
        (Some(condition), Some(on_true), Some(on_false)) => {
            force(interp, if condition { on_true } else { on_false })
        },
        _ => Err(failed("expected a bool condition and two branches")),
    }
}

fn if_true(interp: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value, ForeignError> {
    let mut args = args.into_iter();
    match (args.next().and_then(|c| c.as_bool()), args.next()) {
        (Some(true), Some(on_true)) => force(interp, on_true),
        (Some(false), Some(_)) => Ok(Value::Null),
        _ => Err(failed("expected a bool condition and a branch")),
    }
}

fn decl(name: &str, style: Style, sig: Vec<BType>, ret: BType, func: crate::pace::eval::ForeignFn) -> ForeignDecl {
    ForeignDecl { name: name.to_string(), style, sig, ret, func }
}

/// Every function of the prelude.
pub fn prelude() -> Vec<ForeignDecl> {
    let int2 = || vec![BType::int(), BType::int()];
    let num2 = || vec![BType::num(), BType::num()];
    vec![
        decl("+", Style::Binary, int2(), BType::int(), add_int),
        decl("+", Style::Binary, num2(), BType::num(), add_num),
        decl("+", Style::Binary, vec![BType::txt(), BType::txt()], BType::txt(), concat),
        decl("-", Style::Binary, int2(), BType::int(), sub_int),
        decl("-", Style::Binary, num2(), BType::num(), sub_num),
        decl("*", Style::Binary, int2(), BType::int(), mul_int),
        decl("*", Style::Binary, num2(), BType::num(), mul_num),
        decl("/", Style::Binary, int2(), BType::int(), div_int),
        decl("/", Style::Binary, num2(), BType::num(), div_num),
        decl("<", Style::Binary, num2(), BType::bool(), less),
        decl(">", Style::Binary, num2(), BType::bool(), greater),
        decl("==", Style::Binary, vec![BType::Any, BType::Any], BType::bool(), equals),
        decl("not", Style::Unary, vec![BType::bool()], BType::bool(), not),
        decl("count", Style::Unary, vec![BType::Any], BType::int(), count),
        decl("ifTrue:ifFalse:", Style::Ternary, vec![BType::bool(), BType::Any, BType::Any], BType::Any, if_true_if_false),
        decl("ifTrue:", Style::Binary, vec![BType::bool(), BType::Any], BType::Any, if_true),
    ]
}

/// Creates the prelude table. Module tables copy its functions.
pub(crate) fn install_prelude(symbols: &mut Symbols) -> Result<TableId, CoreError> {
    let table = symbols.new_module(PRELUDE_MODULE);
    let span = SrcSpan::default();
    for decl in prelude() {
        let home = symbols.def_function_meta(table, &decl.name, decl.style, Scope::Local, span)?;
        symbols.bind_function(home, &decl.name, Implementation {
            sig: decl.sig,
            ret: decl.ret,
            target: FnImpl::Foreign(decl.func),
        }, span)?;
    }
    Ok(table)
}
