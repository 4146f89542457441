// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Access rules and their evaluation.
//!
//! A [`RuleSet`] is an ordered chain of [`Rule`]s. Each rule names a path
//! pattern, the operations it covers, and a list of [`Condition`]s. A request
//! is allowed when at least one rule covering it has every condition hold;
//! anything else is denied. Conditions are checked in order and stop at the
//! first failure.
//!
//! Evaluation is a pure function of the [`AccessRequest`]: it never looks at
//! stored objects, the clock, or any other state.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RulesConfig;
use crate::error::{Error, Result};
use crate::path::StoragePath;

/// Variable name that [`Condition::Owner`] compares against by default.
pub const DEFAULT_OWNER_SEGMENT: &str = "userId";

/// The identity making a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Actor {
    /// No credentials were presented.
    Anonymous,
    /// Authenticated as the given user id.
    User(String),
}

impl Actor {
    /// Creates an authenticated actor.
    #[must_use]
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    /// The user id, if authenticated.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(id),
        }
    }

    /// Whether the actor is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => f.write_str("anonymous"),
            Self::User(id) => write!(f, "user:{id}"),
        }
    }
}

/// Operations subject to access rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Fetch an object's metadata and download reference.
    Read,
    /// List the contents of a directory.
    List,
    /// Upload to a path with no existing object.
    Create,
    /// Upload over an existing object.
    Update,
    /// Change an existing object's metadata.
    UpdateMetadata,
    /// Remove an object.
    Delete,
}

impl Operation {
    /// Every operation, in declaration order.
    pub const ALL: [Operation; 6] = [
        Self::Read,
        Self::List,
        Self::Create,
        Self::Update,
        Self::UpdateMetadata,
        Self::Delete,
    ];

    /// Returns the operation name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::UpdateMetadata => "update_metadata",
            Self::Delete => "delete",
        }
    }

    /// Parse an operation from its name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Self::Read),
            "list" => Some(Self::List),
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "update_metadata" => Some(Self::UpdateMetadata),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Whether requests for this operation carry a [`Payload`].
    #[must_use]
    pub const fn carries_payload(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::UpdateMetadata)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown operation '{s}'"))
    }
}

/// Size and declared type of the object a write would produce.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload {
    /// Size in bytes.
    pub size: u64,
    /// Declared content type.
    pub content_type: Option<String>,
}

impl Payload {
    /// Creates a payload descriptor.
    #[must_use]
    pub fn new(size: u64, content_type: Option<&str>) -> Self {
        Self { size, content_type: content_type.map(String::from) }
    }
}

/// Everything the rules may look at.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    /// Who is asking.
    pub actor: Actor,
    /// Target object path, or the directory being listed.
    pub path: StoragePath,
    /// What they want to do.
    pub operation: Operation,
    /// The resulting object for writes.
    pub payload: Option<Payload>,
}

impl AccessRequest {
    /// Creates a request without a payload.
    #[must_use]
    pub fn new(actor: Actor, path: StoragePath, operation: Operation) -> Self {
        Self { actor, path, operation, payload: None }
    }

    /// Attaches a payload descriptor.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// The result of rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Some rule allowed the request.
    Allow,
    /// No rule allowed the request.
    Deny,
}

impl PolicyDecision {
    /// Whether the request may proceed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Returns `"allow"` or `"deny"`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl std::fmt::Display for PolicyDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One segment of a [`PathPattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSegment {
    /// Must equal the path segment exactly.
    Literal(String),
    /// Matches any single segment and binds it to the name.
    Variable(String),
}

/// A path template such as `users/{userId}/{fileName}`.
///
/// Patterns match whole segments and only paths with the same number of
/// segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathPattern {
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    /// Parses a pattern.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for empty patterns or segments,
    /// malformed or duplicate variables.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Err(Error::Config("path pattern must not be empty".to_string()));
        }

        let mut segments = Vec::new();
        for part in trimmed.split('/') {
            let segment = if let Some(name) =
                part.strip_prefix('{').and_then(|rest| rest.strip_suffix('}'))
            {
                if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    return Err(Error::Config(format!(
                        "invalid variable '{part}' in pattern '{raw}'"
                    )));
                }
                if segments.iter().any(|s| matches!(s, PatternSegment::Variable(v) if v == name)) {
                    return Err(Error::Config(format!(
                        "variable '{name}' appears twice in pattern '{raw}'"
                    )));
                }
                PatternSegment::Variable(name.to_string())
            } else if part.is_empty() || part.contains('{') || part.contains('}') {
                return Err(Error::Config(format!("invalid segment '{part}' in pattern '{raw}'")));
            } else {
                PatternSegment::Literal(part.to_string())
            };
            segments.push(segment);
        }

        Ok(Self { segments })
    }

    /// The pattern's segments.
    #[must_use]
    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    /// Whether the pattern binds `name`.
    #[must_use]
    pub fn has_variable(&self, name: &str) -> bool {
        self.segments.iter().any(|s| matches!(s, PatternSegment::Variable(v) if v == name))
    }

    /// Matches `path`, returning the variable bindings on success.
    #[must_use]
    pub fn matches<'a>(&'a self, path: &'a StoragePath) -> Option<Bindings<'a>> {
        if path.depth() != self.segments.len() {
            return None;
        }

        let mut vars = Vec::new();
        for (pattern, actual) in self.segments.iter().zip(path.segments()) {
            match pattern {
                PatternSegment::Literal(expected) if expected == actual => {}
                PatternSegment::Literal(_) => return None,
                PatternSegment::Variable(name) => vars.push((name.as_str(), actual)),
            }
        }
        Some(Bindings { vars })
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match segment {
                PatternSegment::Literal(s) => f.write_str(s)?,
                PatternSegment::Variable(v) => write!(f, "{{{v}}}")?,
            }
        }
        Ok(())
    }
}

impl TryFrom<String> for PathPattern {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PathPattern> for String {
    fn from(pattern: PathPattern) -> Self {
        pattern.to_string()
    }
}

/// Variables bound by a successful [`PathPattern::matches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings<'a> {
    vars: Vec<(&'a str, &'a str)>,
}

impl<'a> Bindings<'a> {
    /// Looks up a bound variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.vars.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }
}

fn default_owner_segment() -> String {
    DEFAULT_OWNER_SEGMENT.to_string()
}

/// A single predicate in a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Condition {
    /// The actor is authenticated.
    Authenticated,
    /// The actor's user id equals the path segment bound to `segment`.
    Owner {
        /// Pattern variable holding the owner id.
        #[serde(default = "default_owner_segment")]
        segment: String,
    },
    /// A payload is present and strictly smaller than `bytes`.
    MaxSize {
        /// Exclusive upper bound in bytes.
        bytes: u64,
    },
    /// A payload is present and declares exactly this content type.
    ContentType {
        /// Required content type.
        value: String,
    },
    /// The file name ends in one of these extensions (without the dot).
    Extension {
        /// Accepted extensions, compared case-sensitively.
        allowed: Vec<String>,
    },
}

impl Condition {
    /// Owner check against the default variable.
    #[must_use]
    pub fn owner() -> Self {
        Self::Owner { segment: default_owner_segment() }
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Authenticated => "authenticated",
            Self::Owner { .. } => "owner",
            Self::MaxSize { .. } => "max_size",
            Self::ContentType { .. } => "content_type",
            Self::Extension { .. } => "extension",
        }
    }

    fn holds(&self, request: &AccessRequest, bindings: &Bindings<'_>) -> bool {
        match self {
            Self::Authenticated => request.actor.is_authenticated(),
            Self::Owner { segment } => match (request.actor.user_id(), bindings.get(segment)) {
                (Some(uid), Some(owner)) => uid == owner,
                _ => false,
            },
            Self::MaxSize { bytes } => request.payload.as_ref().is_some_and(|p| p.size < *bytes),
            Self::ContentType { value } => request
                .payload
                .as_ref()
                .and_then(|p| p.content_type.as_deref())
                .is_some_and(|ct| ct == value),
            Self::Extension { allowed } => request.path.extension().is_some_and(|ext| {
                allowed.iter().any(|a| a.strip_prefix('.').unwrap_or(a) == ext)
            }),
        }
    }
}

/// A pattern, the operations it governs, and the conditions that allow them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Optional label for logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Paths this rule governs.
    pub pattern: PathPattern,
    /// Operations this rule governs.
    pub operations: Vec<Operation>,
    /// All must hold for the rule to allow. Empty means unconditional.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Rule {
    /// Creates a rule.
    #[must_use]
    pub fn new(pattern: PathPattern, operations: &[Operation], conditions: Vec<Condition>) -> Self {
        Self { name: None, pattern, operations: operations.to_vec(), conditions }
    }

    /// Sets the rule label.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn applies_to<'a>(&'a self, request: &'a AccessRequest) -> Option<Bindings<'a>> {
        if !self.operations.contains(&request.operation) {
            return None;
        }
        self.pattern.matches(&request.path)
    }

    fn first_failure(
        &self,
        request: &AccessRequest,
        bindings: &Bindings<'_>,
    ) -> Option<&Condition> {
        self.conditions.iter().find(|c| !c.holds(request, bindings))
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.operations.is_empty() {
            return Err("rule must name at least one operation".to_string());
        }
        for condition in &self.conditions {
            match condition {
                Condition::Owner { segment } if !self.pattern.has_variable(segment) => {
                    return Err(format!(
                        "owner condition refers to '{segment}', which pattern '{}' does not bind",
                        self.pattern
                    ));
                }
                Condition::MaxSize { bytes: 0 } => {
                    return Err("max_size of 0 can never be satisfied".to_string());
                }
                Condition::Extension { allowed } if allowed.is_empty() => {
                    return Err("extension condition needs at least one extension".to_string());
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// An ordered chain of rules. See the module docs for semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    /// The rules, in evaluation order.
    #[serde(default, rename = "rule")]
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Creates a rule set.
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// A rule set that denies everything.
    #[must_use]
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// The per-user image rules.
    ///
    /// Owners may read their objects and list their directory. Owners may
    /// create or overwrite objects under the configured size ceiling, with
    /// the configured content type and file extension. Nothing else is
    /// allowed, including metadata updates and deletes.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `owner_root` is not a valid pattern
    /// prefix or the resulting rules fail validation.
    pub fn user_images(config: &RulesConfig) -> Result<Self> {
        let root = config.owner_root.trim_matches('/');
        let object = PathPattern::parse(&format!("{root}/{{userId}}/{{fileName}}"))?;
        let directory = PathPattern::parse(&format!("{root}/{{userId}}"))?;

        let rules = vec![
            Rule::new(object.clone(), &[Operation::Read], vec![Condition::owner()])
                .named("owner-read"),
            Rule::new(directory, &[Operation::List], vec![Condition::owner()]).named("owner-list"),
            Rule::new(
                object,
                &[Operation::Create, Operation::Update],
                vec![
                    Condition::owner(),
                    Condition::MaxSize { bytes: config.max_upload_bytes },
                    Condition::ContentType { value: config.content_type.clone() },
                    Condition::Extension { allowed: config.extensions.clone() },
                ],
            )
            .named("owner-write"),
        ];

        let set = Self::new(rules);
        set.validate()?;
        Ok(set)
    }

    /// Parses and validates a TOML rules document.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the document is malformed or invalid.
    pub fn from_toml(content: &str) -> Result<Self> {
        let set: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        set.validate()?;
        Ok(set)
    }

    /// Loads and validates a TOML rules file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Serializes the rule set to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Validates every rule.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid rule.
    pub fn validate(&self) -> Result<()> {
        for (i, rule) in self.rules.iter().enumerate() {
            rule.validate().map_err(|e| Error::Config(format!("rule {i}: {e}")))?;
        }
        Ok(())
    }

    /// Decides whether `request` is allowed.
    #[must_use]
    pub fn evaluate(&self, request: &AccessRequest) -> PolicyDecision {
        for (index, rule) in self.rules.iter().enumerate() {
            let Some(bindings) = rule.applies_to(request) else {
                continue;
            };

            match rule.first_failure(request, &bindings) {
                None => {
                    debug!(
                        rule = index,
                        name = rule.name.as_deref().unwrap_or(""),
                        actor = %request.actor,
                        operation = %request.operation,
                        path = %request.path,
                        "rule allowed request"
                    );
                    return PolicyDecision::Allow;
                }
                Some(condition) => {
                    debug!(
                        rule = index,
                        name = rule.name.as_deref().unwrap_or(""),
                        condition = condition.name(),
                        actor = %request.actor,
                        operation = %request.operation,
                        path = %request.path,
                        "rule condition failed"
                    );
                }
            }
        }

        PolicyDecision::Deny
    }
}
