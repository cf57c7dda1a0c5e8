/// GraphQL Security Module
///
/// Static, pre-execution analysis of incoming query documents:
/// - Query depth limits
/// - Query complexity limits, scaled by pagination arguments
///
/// Fragments are inlined before measuring, so a query written with fragment
/// spreads costs exactly what the equivalent inlined query costs. Pagination
/// arguments bound to variables are resolved against the request's variables
/// (then the variable's declared default, then the field's default page
/// size) before scoring.
///
/// `__schema` and `__type` selections count toward complexity but not depth,
/// so GraphiQL's introspection query passes the default policy.
use async_graphql::parser::types::{
    ExecutableDocument, Field, FragmentDefinition, OperationDefinition, SelectionSet,
};
use async_graphql::parser::{parse_query, Positioned};
use async_graphql::{Name, Request, Value, Variables};
use crypto_core::hash::sha256_hex_parts;
use dashmap::DashMap;
use std::collections::HashMap;
use std::convert::Infallible;
use tracing::{debug, warn};

use crate::error::{GatewayError, Result};
use crate::metrics::{GUARD_CACHE_HIT, GUARD_CACHE_MISS};
use crate::schema::note::DEFAULT_PAGE_SIZE;

/// Default number of analyses kept in the guard cache
const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Fields whose selections are left out of the depth measurement
const INTROSPECTION_ROOTS: [&str; 2] = ["__schema", "__type"];

static DEFAULT_FIELD_COST: FieldCost = FieldCost {
    base_cost: 1,
    multiplier_arg: None,
    default_multiplier: 1,
};

/// Cost metadata for a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCost {
    /// Cost of resolving the field itself
    pub base_cost: u64,
    /// Argument whose value multiplies the cost of the field's selection
    /// (e.g. `first` on a paginated list)
    pub multiplier_arg: Option<String>,
    /// Multiplier used when the argument is omitted or null
    pub default_multiplier: u64,
}

impl FieldCost {
    /// A list field whose cost scales with the page size requested via `arg`
    pub fn paginated(arg: impl Into<String>, default_page_size: u64) -> Self {
        Self {
            base_cost: 1,
            multiplier_arg: Some(arg.into()),
            default_multiplier: default_page_size,
        }
    }
}

impl Default for FieldCost {
    fn default() -> Self {
        DEFAULT_FIELD_COST.clone()
    }
}

/// Process-wide query limits
#[derive(Debug, Clone)]
pub struct QueryCostPolicy {
    pub max_depth: usize,
    pub max_complexity: u64,
    field_costs: HashMap<String, FieldCost>,
}

impl QueryCostPolicy {
    /// Policy with unit cost for every field
    pub fn new(max_depth: usize, max_complexity: u64) -> Self {
        Self {
            max_depth,
            max_complexity,
            field_costs: HashMap::new(),
        }
    }

    /// Policy with the cost table of the notes schema
    pub fn for_notes_schema(max_depth: usize, max_complexity: u64) -> Self {
        Self::new(max_depth, max_complexity)
            .with_field_cost("notes", FieldCost::paginated("first", DEFAULT_PAGE_SIZE as u64))
    }

    /// Declare an explicit cost for a field name
    pub fn with_field_cost(mut self, field: impl Into<String>, cost: FieldCost) -> Self {
        self.field_costs.insert(field.into(), cost);
        self
    }

    pub fn field_cost(&self, field: &str) -> &FieldCost {
        self.field_costs.get(field).unwrap_or(&DEFAULT_FIELD_COST)
    }
}

impl Default for QueryCostPolicy {
    fn default() -> Self {
        Self::for_notes_schema(10, 1000)
    }
}

/// Measured shape of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryCost {
    pub depth: usize,
    pub complexity: u64,
}

impl QueryCost {
    const ZERO: Self = Self {
        depth: 0,
        complexity: 0,
    };

    fn merge(self, other: Self) -> Self {
        Self {
            depth: self.depth.max(other.depth),
            complexity: self.complexity.saturating_add(other.complexity),
        }
    }
}

/// Depth and complexity limiter
///
/// Analyses are memoised by a hash of query text, variables and operation
/// name; the verdict is recomputed against the policy on every call.
pub struct QueryGuard {
    policy: QueryCostPolicy,
    cache: DashMap<String, QueryCost>,
    max_cache_entries: usize,
}

impl QueryGuard {
    pub fn new(policy: QueryCostPolicy) -> Self {
        Self::with_cache_capacity(policy, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(policy: QueryCostPolicy, max_cache_entries: usize) -> Self {
        debug!(
            max_depth = policy.max_depth,
            max_complexity = policy.max_complexity,
            max_cache_entries,
            "Initializing query guard"
        );

        Self {
            policy,
            cache: DashMap::new(),
            max_cache_entries,
        }
    }

    pub fn policy(&self) -> &QueryCostPolicy {
        &self.policy
    }

    /// Number of memoised analyses
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Enforce the policy on a GraphQL request
    pub fn check_request(&self, request: &Request) -> Result<QueryCost> {
        self.check(
            &request.query,
            &request.variables,
            request.operation_name.as_deref(),
        )
    }

    /// Analyze a query and reject it if it exceeds the policy
    pub fn check(
        &self,
        query: &str,
        variables: &Variables,
        operation_name: Option<&str>,
    ) -> Result<QueryCost> {
        let cost = self.analyze(query, variables, operation_name)?;

        if cost.depth > self.policy.max_depth {
            warn!(
                depth = cost.depth,
                max_depth = self.policy.max_depth,
                "Query rejected: too deep"
            );
            return Err(GatewayError::QueryTooDeep {
                depth: cost.depth,
                max_depth: self.policy.max_depth,
            });
        }

        if cost.complexity > self.policy.max_complexity {
            warn!(
                complexity = cost.complexity,
                max_complexity = self.policy.max_complexity,
                "Query rejected: too complex"
            );
            return Err(GatewayError::QueryTooComplex {
                complexity: cost.complexity,
                max_complexity: self.policy.max_complexity,
            });
        }

        Ok(cost)
    }

    /// Measure depth and complexity without enforcing limits
    pub fn analyze(
        &self,
        query: &str,
        variables: &Variables,
        operation_name: Option<&str>,
    ) -> Result<QueryCost> {
        let variables_json = serde_json::to_vec(variables)
            .map_err(|e| GatewayError::InvalidQuery(format!("Unserializable variables: {}", e)))?;
        let key = sha256_hex_parts([
            query.as_bytes(),
            variables_json.as_slice(),
            operation_name.unwrap_or_default().as_bytes(),
        ]);

        if let Some(cost) = self.cache.get(&key) {
            GUARD_CACHE_HIT.inc();
            return Ok(*cost);
        }
        GUARD_CACHE_MISS.inc();

        let document =
            parse_query(query).map_err(|e| GatewayError::InvalidQuery(e.to_string()))?;
        let cost = measure_document(&self.policy, &document, variables, operation_name)?;

        self.enforce_cache_limit();
        self.cache.insert(key, cost);

        Ok(cost)
    }

    /// Evict roughly 10% of entries once the cache is full
    fn enforce_cache_limit(&self) {
        if self.cache.len() < self.max_cache_entries {
            return;
        }

        let evict_count = (self.cache.len() / 10).max(1);
        let keys: Vec<String> = self
            .cache
            .iter()
            .take(evict_count)
            .map(|entry| entry.key().clone())
            .collect();

        for key in keys {
            self.cache.remove(&key);
        }

        debug!(evict_count, "Query guard cache eviction complete");
    }
}

/// Measure a parsed document
///
/// With an operation name, only that operation is measured; otherwise the
/// most expensive operation in the document decides.
pub fn measure_document(
    policy: &QueryCostPolicy,
    document: &ExecutableDocument,
    variables: &Variables,
    operation_name: Option<&str>,
) -> Result<QueryCost> {
    let mut total = QueryCost::ZERO;
    let mut matched = false;

    for (name, operation) in document.operations.iter() {
        if let Some(wanted) = operation_name {
            if name.map(Name::as_str) != Some(wanted) {
                continue;
            }
        }
        matched = true;

        let mut walker = CostWalker::new(policy, &document.fragments, variables, &operation.node);
        let cost = walker.selection_set(&operation.node.selection_set.node, 0)?;
        total = QueryCost {
            depth: total.depth.max(cost.depth),
            complexity: total.complexity.max(cost.complexity),
        };
    }

    match operation_name {
        Some(wanted) if !matched => Err(GatewayError::InvalidQuery(format!(
            "Unknown operation named \"{}\"",
            wanted
        ))),
        _ => Ok(total),
    }
}

/// Walks one operation, inlining fragment spreads
struct CostWalker<'a> {
    policy: &'a QueryCostPolicy,
    fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    variables: &'a Variables,
    defaults: HashMap<&'a str, &'a Value>,
    /// Fragments currently being expanded, for cycle detection
    expanding: Vec<&'a str>,
    /// Fragment cost relative to the spread site
    fragment_costs: HashMap<&'a str, QueryCost>,
}

impl<'a> CostWalker<'a> {
    fn new(
        policy: &'a QueryCostPolicy,
        fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
        variables: &'a Variables,
        operation: &'a OperationDefinition,
    ) -> Self {
        let defaults = operation
            .variable_definitions
            .iter()
            .filter_map(|def| {
                def.node
                    .default_value
                    .as_ref()
                    .map(|value| (def.node.name.node.as_str(), &value.node))
            })
            .collect();

        Self {
            policy,
            fragments,
            variables,
            defaults,
            expanding: Vec::new(),
            fragment_costs: HashMap::new(),
        }
    }

    /// Cost of a selection set whose parent sits at `depth`
    fn selection_set(&mut self, set: &'a SelectionSet, depth: usize) -> Result<QueryCost> {
        use async_graphql::parser::types::Selection;

        let mut cost = QueryCost {
            depth,
            complexity: 0,
        };

        for selection in &set.items {
            let child = match &selection.node {
                Selection::Field(field) => self.field(&field.node, depth)?,
                // Inline fragments add no level of their own
                Selection::InlineFragment(fragment) => {
                    self.selection_set(&fragment.node.selection_set.node, depth)?
                }
                Selection::FragmentSpread(spread) => {
                    self.fragment_spread(spread.node.fragment_name.node.as_str(), depth)?
                }
            };
            cost = cost.merge(child);
        }

        Ok(cost)
    }

    fn field(&mut self, field: &'a Field, parent_depth: usize) -> Result<QueryCost> {
        let depth = parent_depth + 1;
        let children = self.selection_set(&field.selection_set.node, depth)?;
        let field_cost = self.policy.field_cost(field.name.node.as_str());
        let multiplier = self.multiplier(field, field_cost);

        let complexity = if field.selection_set.node.items.is_empty() {
            field_cost.base_cost.saturating_mul(multiplier)
        } else {
            field_cost
                .base_cost
                .saturating_add(multiplier.saturating_mul(children.complexity))
        };

        // Introspection subtrees are bounded by the type system, not the query
        if INTROSPECTION_ROOTS.contains(&field.name.node.as_str()) {
            return Ok(QueryCost {
                depth: parent_depth,
                complexity,
            });
        }

        Ok(QueryCost {
            depth: children.depth.max(depth),
            complexity,
        })
    }

    fn fragment_spread(&mut self, name: &'a str, depth: usize) -> Result<QueryCost> {
        if self.expanding.contains(&name) {
            return Err(GatewayError::InvalidQuery(format!(
                "Fragment \"{}\" is spread within itself",
                name
            )));
        }

        let relative = match self.fragment_costs.get(name) {
            Some(cost) => *cost,
            None => {
                // Undefined fragments are reported by execution-time validation
                let Some(fragment) = self.fragments.get(name) else {
                    return Ok(QueryCost {
                        depth,
                        complexity: 0,
                    });
                };

                self.expanding.push(name);
                let cost = self.selection_set(&fragment.node.selection_set.node, 0);
                self.expanding.pop();

                let cost = cost?;
                self.fragment_costs.insert(name, cost);
                cost
            }
        };

        Ok(QueryCost {
            depth: depth.saturating_add(relative.depth),
            complexity: relative.complexity,
        })
    }

    fn multiplier(&self, field: &Field, cost: &FieldCost) -> u64 {
        let Some(arg) = cost.multiplier_arg.as_deref() else {
            return 1;
        };

        let Some((_, value)) = field
            .arguments
            .iter()
            .find(|(name, _)| name.node.as_str() == arg)
        else {
            return cost.default_multiplier;
        };

        let resolved = value
            .node
            .clone()
            .into_const_with(|name| Ok::<_, Infallible>(self.variable(&name)))
            .unwrap_or_else(|never| match never {});

        match resolved {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_i64().map(|v| v.max(0) as u64))
                .unwrap_or(cost.default_multiplier),
            _ => cost.default_multiplier,
        }
    }

    /// Bound value, then declared default, then null
    fn variable(&self, name: &Name) -> Value {
        self.variables
            .get(name)
            .or_else(|| self.defaults.get(name.as_str()).copied())
            .cloned()
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard(max_depth: usize, max_complexity: u64) -> QueryGuard {
        QueryGuard::new(QueryCostPolicy::for_notes_schema(max_depth, max_complexity))
    }

    fn analyze(query: &str) -> QueryCost {
        guard(100, u64::MAX)
            .analyze(query, &Variables::default(), None)
            .unwrap()
    }

    #[test]
    fn test_simple_query_cost() {
        let cost = analyze("{ notes { id content author } }");
        assert_eq!(cost.depth, 2);
        // 1 + default page (100) * 3 leaf fields
        assert_eq!(cost.complexity, 301);
    }

    #[test]
    fn test_unpaginated_fields_cost_one_each() {
        let cost = analyze("{ note(id: \"1\") { id content } me { id } }");
        assert_eq!(cost.depth, 2);
        assert_eq!(cost.complexity, (1 + 2) + (1 + 1));
    }

    #[test]
    fn test_literal_page_size_scales_cost() {
        let cost = analyze("{ notes(first: 500) { id } }");
        assert_eq!(cost.complexity, 501);
    }

    #[test]
    fn test_negative_page_size_clamped() {
        let cost = analyze("{ notes(first: -5) { id } }");
        assert_eq!(cost.complexity, 1);
    }

    #[test]
    fn test_null_page_size_uses_default() {
        let cost = analyze("{ notes(first: null) { id } }");
        assert_eq!(cost.complexity, 101);
    }

    #[test]
    fn test_inline_fragment_adds_no_depth() {
        let inline = analyze("{ notes { ... on Note { id } } }");
        let plain = analyze("{ notes { id } }");
        assert_eq!(inline, plain);
    }

    #[test]
    fn test_fragment_cycle_rejected() {
        let result = guard(100, u64::MAX).analyze(
            "query { notes { ...A } } fragment A on Note { ...B } fragment B on Note { ...A }",
            &Variables::default(),
            None,
        );
        assert!(matches!(result, Err(GatewayError::InvalidQuery(_))));
    }

    #[test]
    fn test_undefined_fragment_costs_nothing() {
        let cost = analyze("{ notes { id ...Missing } }");
        assert_eq!(cost, analyze("{ notes { id } }"));
    }

    #[test]
    fn test_parse_error_is_invalid_query() {
        let result = guard(10, 1000).analyze("{ notes { id ", &Variables::default(), None);
        assert!(matches!(result, Err(GatewayError::InvalidQuery(_))));
    }

    #[test]
    fn test_operation_name_selects_operation() {
        let query = "query Small { me { id } } query Big { notes(first: 50) { id } }";
        let guard = guard(100, u64::MAX);

        let small = guard
            .analyze(query, &Variables::default(), Some("Small"))
            .unwrap();
        let big = guard
            .analyze(query, &Variables::default(), Some("Big"))
            .unwrap();
        let unnamed = guard.analyze(query, &Variables::default(), None).unwrap();

        assert_eq!(small.complexity, 2);
        assert_eq!(big.complexity, 51);
        assert_eq!(unnamed.complexity, 51);
    }

    #[test]
    fn test_unknown_operation_name_rejected() {
        let result = guard(10, 1000).analyze(
            "query Known { me { id } }",
            &Variables::default(),
            Some("Unknown"),
        );
        assert!(matches!(result, Err(GatewayError::InvalidQuery(_))));
    }

    #[test]
    fn test_analysis_is_cached() {
        let guard = guard(10, 1000);
        let vars = Variables::default();

        guard.analyze("{ notes { id } }", &vars, None).unwrap();
        guard.analyze("{ notes { id } }", &vars, None).unwrap();
        assert_eq!(guard.cached_entries(), 1);

        guard.analyze("{ me { id } }", &vars, None).unwrap();
        assert_eq!(guard.cached_entries(), 2);
    }

    #[test]
    fn test_cache_is_bounded() {
        let guard = QueryGuard::with_cache_capacity(QueryCostPolicy::default(), 5);
        let vars = Variables::default();

        for n in 0..20 {
            let query = format!("{{ notes(first: {}) {{ id }} }}", n);
            guard.analyze(&query, &vars, None).unwrap();
        }

        assert!(guard.cached_entries() <= 5);
    }

    #[test]
    fn test_field_cost_lookup_defaults() {
        let policy = QueryCostPolicy::for_notes_schema(10, 1000);
        assert_eq!(policy.field_cost("content"), &FieldCost::default());
        assert_eq!(
            policy.field_cost("notes").multiplier_arg.as_deref(),
            Some("first")
        );
    }

    #[test]
    fn test_custom_field_cost() {
        let policy = QueryCostPolicy::new(10, 1000).with_field_cost(
            "content",
            FieldCost {
                base_cost: 5,
                multiplier_arg: None,
                default_multiplier: 1,
            },
        );
        let cost = QueryGuard::new(policy)
            .analyze("{ note(id: \"1\") { content } }", &Variables::default(), None)
            .unwrap();
        assert_eq!(cost.complexity, 1 + 5);
    }

    #[test]
    fn test_introspection_excluded_from_depth() {
        let cost = analyze("{ __schema { types { fields { type { ofType { ofType { name } } } } } } }");
        assert_eq!(cost.depth, 0);
        assert_eq!(cost.complexity, 7);

        let mixed = analyze("{ __type(name: \"Note\") { fields { name } } notes { id } }");
        assert_eq!(mixed.depth, 2);
        assert_eq!(mixed.complexity, (1 + (1 + 1)) + (1 + 100));
    }
}
