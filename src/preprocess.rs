// preprocess.rs - 输入值预处理
//! 在谓词解析之前改写 `input[field]` 的命名转换

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::engine::{FilterError, FilterResult};
use crate::query::{InputValue, InputValues};

/// 预处理器：原地改写 `input[field]`
pub trait Preprocessor: Send + Sync {
    fn preprocess(&self, field: &str, input: &mut InputValues) -> FilterResult<()>;
}

/// 闭包形式的预处理器
pub struct FnPreprocessor<F>(pub F);

impl<F> Preprocessor for FnPreprocessor<F>
where
    F: Fn(&str, &mut InputValues) -> FilterResult<()> + Send + Sync,
{
    fn preprocess(&self, field: &str, input: &mut InputValues) -> FilterResult<()> {
        (self.0)(field, input)
    }
}

/// 内置预处理命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinPreprocess {
    /// 日期区间的结束日期后移一天，得到左闭右开区间
    HalfOpenDate,
}

const BUILTIN_PREPROCESSES: &[(&str, BuiltinPreprocess)] =
    &[("halfOpenDate", BuiltinPreprocess::HalfOpenDate)];

impl BuiltinPreprocess {
    pub fn from_name(name: &str) -> Option<Self> {
        BUILTIN_PREPROCESSES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, p)| *p)
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        BUILTIN_PREPROCESSES.iter().map(|(n, _)| *n)
    }
}

impl Preprocessor for BuiltinPreprocess {
    fn preprocess(&self, field: &str, input: &mut InputValues) -> FilterResult<()> {
        match self {
            Self::HalfOpenDate => half_open_date(field, input),
        }
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// 可识别的日期格式
const DATE_FORMATS: &[&str] = &[DATE_FORMAT, "%Y/%m/%d"];

/// 可识别的日期时间格式（只取日期部分）
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// `[start, end]`、`"start,end"` 或单个日期 -> `[start, end + 1 天]`
///
/// 值为空时不做任何处理。
fn half_open_date(field: &str, input: &mut InputValues) -> FilterResult<()> {
    let items = match input.get(field) {
        Some(value) if !value.is_empty() => value.to_list(),
        _ => return Ok(()),
    };

    let (start, end) = match items.as_slice() {
        [single] => (single.clone(), single.as_str()),
        [start, end] => (start.clone(), end.as_str()),
        _ => {
            return Err(FilterError::InvalidArgument {
                field: field.to_string(),
                reason: format!("expected a date or a date pair, got {} values", items.len()),
            });
        }
    };

    let end = next_day(field, end)?;
    input.insert(field, InputValue::List(vec![start, end]));
    Ok(())
}

/// 解析日期；带时区偏移的时间取其本地日期
fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn next_day(field: &str, raw: &str) -> FilterResult<String> {
    let raw = raw.trim();
    let date = parse_date(raw).ok_or_else(|| FilterError::InvalidArgument {
        field: field.to_string(),
        reason: format!("invalid date '{}'", raw),
    })?;

    let next = date.succ_opt().ok_or_else(|| FilterError::InvalidArgument {
        field: field.to_string(),
        reason: format!("date '{}' is out of range", raw),
    })?;
    Ok(next.format(DATE_FORMAT).to_string())
}
