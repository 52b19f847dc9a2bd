//! 切点（Pointcut）匹配系统
//!
//! 切点由类过滤器与方法匹配器两部分组成，分别判断
//! 目标类型与方法名；两者都命中才算匹配。

use std::sync::Arc;

use regex::Regex;

/// 简单的模式匹配（支持 * 通配符）
///
/// 支持的模式：
/// - `*` - 匹配任意字符串
/// - `User*` - 以 User 开头
/// - `*Service` - 以 Service 结尾
/// - `*Service*` - 包含 Service
fn pattern_matches(pattern: &str, target: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if !pattern.contains('*') {
        return pattern == target;
    }

    // 将 * 转换为正则表达式
    let escaped = regex::escape(pattern).replace("\\*", ".*");
    let regex_pattern = format!("^{}$", escaped);

    match Regex::new(&regex_pattern) {
        Ok(regex) => regex.is_match(target),
        Err(_) => false,
    }
}

/// 类过滤器 - 判断目标类型是否在切点范围内
#[derive(Clone)]
pub enum ClassFilter {
    /// 匹配所有类型
    All,

    /// 通配符模式，例如 `*Service`
    Pattern(String),

    /// 正则匹配
    Regex(Regex),

    /// 自定义匹配函数
    Custom(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl ClassFilter {
    pub fn matches(&self, class_name: &str) -> bool {
        match self {
            ClassFilter::All => true,
            ClassFilter::Pattern(pattern) => pattern_matches(pattern, class_name),
            ClassFilter::Regex(regex) => regex.is_match(class_name),
            ClassFilter::Custom(func) => func(class_name),
        }
    }
}

impl std::fmt::Debug for ClassFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassFilter::All => write!(f, "All"),
            ClassFilter::Pattern(p) => write!(f, "Pattern({})", p),
            ClassFilter::Regex(r) => write!(f, "Regex({})", r.as_str()),
            ClassFilter::Custom(_) => write!(f, "Custom(...)"),
        }
    }
}

/// 方法匹配器 - 判断方法名是否在切点范围内
#[derive(Clone)]
pub enum MethodMatcher {
    /// 匹配所有方法
    All,

    /// 通配符模式，例如 `get_*`
    Pattern(String),

    /// 正则匹配
    Regex(Regex),

    /// 自定义匹配函数
    Custom(Arc<dyn Fn(&str) -> bool + Send + Sync>),

    /// 与运算（AND）
    And(Box<MethodMatcher>, Box<MethodMatcher>),

    /// 或运算（OR）
    Or(Box<MethodMatcher>, Box<MethodMatcher>),

    /// 非运算（NOT）
    Not(Box<MethodMatcher>),
}

impl MethodMatcher {
    pub fn matches(&self, method_name: &str) -> bool {
        match self {
            MethodMatcher::All => true,
            MethodMatcher::Pattern(pattern) => pattern_matches(pattern, method_name),
            MethodMatcher::Regex(regex) => regex.is_match(method_name),
            MethodMatcher::Custom(func) => func(method_name),
            MethodMatcher::And(left, right) => {
                left.matches(method_name) && right.matches(method_name)
            }
            MethodMatcher::Or(left, right) => {
                left.matches(method_name) || right.matches(method_name)
            }
            MethodMatcher::Not(inner) => !inner.matches(method_name),
        }
    }

    /// 与运算
    pub fn and(self, other: MethodMatcher) -> Self {
        MethodMatcher::And(Box::new(self), Box::new(other))
    }

    /// 或运算
    pub fn or(self, other: MethodMatcher) -> Self {
        MethodMatcher::Or(Box::new(self), Box::new(other))
    }

    /// 非运算
    pub fn not(self) -> Self {
        MethodMatcher::Not(Box::new(self))
    }
}

impl std::fmt::Debug for MethodMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MethodMatcher::All => write!(f, "All"),
            MethodMatcher::Pattern(p) => write!(f, "Pattern({})", p),
            MethodMatcher::Regex(r) => write!(f, "Regex({})", r.as_str()),
            MethodMatcher::Custom(_) => write!(f, "Custom(...)"),
            MethodMatcher::And(l, r) => write!(f, "And({:?}, {:?})", l, r),
            MethodMatcher::Or(l, r) => write!(f, "Or({:?}, {:?})", l, r),
            MethodMatcher::Not(e) => write!(f, "Not({:?})", e),
        }
    }
}

/// 切点 - 类过滤器与方法匹配器的组合
#[derive(Debug, Clone)]
pub struct Pointcut {
    pub class_filter: ClassFilter,
    pub method_matcher: MethodMatcher,
}

impl Pointcut {
    /// 匹配一切的切点
    pub fn truthy() -> Self {
        Self {
            class_filter: ClassFilter::All,
            method_matcher: MethodMatcher::All,
        }
    }

    pub fn new(class_filter: ClassFilter, method_matcher: MethodMatcher) -> Self {
        Self {
            class_filter,
            method_matcher,
        }
    }

    /// 用通配符模式构造切点，例如 `execution("*Service", "find_*")`
    pub fn execution(type_pattern: &str, method_pattern: &str) -> Self {
        Self {
            class_filter: ClassFilter::Pattern(type_pattern.to_string()),
            method_matcher: MethodMatcher::Pattern(method_pattern.to_string()),
        }
    }

    /// 检查连接点是否匹配
    pub fn matches(&self, class_name: &str, method_name: &str) -> bool {
        self.class_filter.matches(class_name) && self.method_matcher.matches(method_name)
    }

    /// 逐成员与运算：类过滤器与方法匹配器分别相交
    pub fn and(self, other: Pointcut) -> Self {
        let left_class = self.class_filter;
        let right_class = other.class_filter;
        Self {
            class_filter: ClassFilter::Custom(Arc::new(move |name| {
                left_class.matches(name) && right_class.matches(name)
            })),
            method_matcher: self.method_matcher.and(other.method_matcher),
        }
    }
}

impl Default for Pointcut {
    fn default() -> Self {
        Self::truthy()
    }
}
