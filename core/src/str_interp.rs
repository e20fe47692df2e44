use std::{borrow::Borrow, collections::HashMap, ffi::OsStr, hash::Hash};

pub type Result = std::result::Result<String, InterpError>;

const OPEN: &str = "$%";
const CLOSE: &str = "%$";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InterpError {
    #[error("Undefined placeholder '$%{0}%$' at {}", .1+1)]
    UndefinedVar(String, usize),

    #[error("Unclosed placeholder (found '$%' at {})", .0+1)]
    UnclosedPlaceholder(usize),
}

/// Replaces every `$%name%$` in `fmt` with `variables[name]`.
/// Text outside placeholders is copied as is.
pub fn interp<K, V>(fmt: &str, variables: &HashMap<K, V>) -> Result
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<OsStr>,
{
    let mut res = String::with_capacity(fmt.len() * 2);
    let mut rest = fmt;
    let mut offset = 0;

    while let Some(open) = rest.find(OPEN) {
        res.push_str(&rest[..open]);
        let name_start = open + OPEN.len();
        let Some(close) = rest[name_start..].find(CLOSE) else {
            return Err(InterpError::UnclosedPlaceholder(offset + open))
        };
        let name = &rest[name_start..name_start + close];
        let Some(value) = variables.get(name) else {
            return Err(InterpError::UndefinedVar(name.to_owned(), offset + open))
        };
        res += value.as_ref().to_string_lossy().as_ref();

        let consumed = name_start + close + CLOSE.len();
        rest = &rest[consumed..];
        offset += consumed;
    }
    res.push_str(rest);
    res.shrink_to_fit();
    Ok(res)
}
