//! Rule catalog: the static registry of rule ids and messages.
//!
//! Identity is the id. The catalog is read-only after process start and is
//! the only state shared between scanners.

/// A lint rule with a stable id and a human-readable message.
#[derive(Debug, PartialEq, Eq)]
pub struct Rule {
    pub id: &'static str,
    pub message: &'static str,
}

pub static MAKO_UNESCAPED_EXPRESSION: Rule = Rule {
    id: "mako-unescaped-expression",
    message: "Expressions using the raw filter must wrap with HTML() or escape().",
};

pub static UNDERSCORE_NOT_ESCAPED: Rule = Rule {
    id: "underscore-not-escaped",
    message: "Expressions should be escaped using <%- expression %>.",
};

pub static JAVASCRIPT_CONCAT_HTML: Rule = Rule {
    id: "javascript-concat-html",
    message: "Use HtmlUtils functions rather than concatenating strings with HTML.",
};

pub static JAVASCRIPT_JQUERY_APPEND: Rule = Rule {
    id: "javascript-jquery-append",
    message: "Use HtmlUtils.append(), or make sure the argument is properly escaped.",
};

pub static JAVASCRIPT_JQUERY_PREPEND: Rule = Rule {
    id: "javascript-jquery-prepend",
    message: "Use HtmlUtils.prepend(), or make sure the argument is properly escaped.",
};

pub static JAVASCRIPT_JQUERY_INSERTION: Rule = Rule {
    id: "javascript-jquery-insertion",
    message: "JQuery insertion calls (e.g. before, after, wrap) must take escaped arguments.",
};

pub static JAVASCRIPT_JQUERY_INSERT_INTO_TARGET: Rule = Rule {
    id: "javascript-jquery-insert-into-target",
    message: "JQuery insert-into-target calls (e.g. appendTo) must come from a DOM reference.",
};

pub static JAVASCRIPT_JQUERY_HTML: Rule = Rule {
    id: "javascript-jquery-html",
    message: "Use HtmlUtils.setHtml(), .text(), or make sure the html() argument is escaped.",
};

pub static JAVASCRIPT_INTERPOLATE: Rule = Rule {
    id: "javascript-interpolate",
    message: "Use StringUtils.interpolate() or HtmlUtils.interpolateHtml().",
};

pub static JAVASCRIPT_ESCAPE: Rule = Rule {
    id: "javascript-escape",
    message: "Avoid calling escape() directly; prefer the sanctioned escaping helpers.",
};

pub static PYTHON_CONCAT_HTML: Rule = Rule {
    id: "python-concat-html",
    message: "Use HTML() and Text() rather than concatenating strings with HTML.",
};

pub static PYTHON_CUSTOM_ESCAPE: Rule = Rule {
    id: "python-custom-escape",
    message: "Use markupsafe.escape() rather than custom escaping with '&lt;'.",
};

pub static PYTHON_DEPRECATED_DISPLAY_NAME: Rule = Rule {
    id: "python-deprecated-display-name",
    message: "Use display_name_with_default instead of the deprecated escaped variant.",
};

pub static PYTHON_WRAP_HTML: Rule = Rule {
    id: "python-wrap-html",
    message: "String containing HTML should be wrapped with HTML().",
};

pub static PYTHON_REQUIRES_HTML_OR_TEXT: Rule = Rule {
    id: "python-requires-html-or-text",
    message: "You must begin with HTML() or Text() if the string contains named placeholders.",
};

pub static PYTHON_CLOSE_BEFORE_FORMAT: Rule = Rule {
    id: "python-close-before-format",
    message: "Close the call to HTML() or Text() before calling format().",
};

pub static PYTHON_INTERPOLATE_HTML: Rule = Rule {
    id: "python-interpolate-html",
    message: "Use HTML() and Text() rather than string interpolation with HTML.",
};

pub static PYTHON_PARSE_ERROR: Rule = Rule {
    id: "python-parse-error",
    message: "File could not be parsed (unbalanced quote or bracket).",
};

/// Every rule known to the scanners, in id order.
pub static CATALOG: &[&Rule] = &[
    &JAVASCRIPT_CONCAT_HTML,
    &JAVASCRIPT_ESCAPE,
    &JAVASCRIPT_INTERPOLATE,
    &JAVASCRIPT_JQUERY_APPEND,
    &JAVASCRIPT_JQUERY_HTML,
    &JAVASCRIPT_JQUERY_INSERT_INTO_TARGET,
    &JAVASCRIPT_JQUERY_INSERTION,
    &JAVASCRIPT_JQUERY_PREPEND,
    &MAKO_UNESCAPED_EXPRESSION,
    &PYTHON_CLOSE_BEFORE_FORMAT,
    &PYTHON_CONCAT_HTML,
    &PYTHON_CUSTOM_ESCAPE,
    &PYTHON_DEPRECATED_DISPLAY_NAME,
    &PYTHON_INTERPOLATE_HTML,
    &PYTHON_PARSE_ERROR,
    &PYTHON_REQUIRES_HTML_OR_TEXT,
    &PYTHON_WRAP_HTML,
    &UNDERSCORE_NOT_ESCAPED,
];

/// Look up a rule by its id.
pub fn by_id(id: &str) -> Option<&'static Rule> {
    CATALOG.iter().find(|r| r.id == id).copied()
}
