//! Topic Router: keyword-scored routing to a cluster preset or chain.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::chain::{ChainEngine, ThinkDepth, ThinkParams, ThinkResult};
use super::vcp::{VcpEngine, VcpParams, VcpResult};
use crate::error::{AppError, AppResult};

/// Confidence reported when no rule matched and the fallback route is used.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Upper bound on reported routing confidence.
const CONFIDENCE_CAP: f64 = 0.95;

/// One routing rule: keyword list plus the routes it selects.
///
/// Rules are evaluated in declaration order; order is the tie-breaker for
/// equal scores, so the list below is ranked, not arbitrary.
struct RouteRule {
    name: &'static str,
    keywords: &'static [&'static str],
    vcp_preset: &'static str,
    chain_key: &'static str,
    /// 1 is highest; feeds the score weight (4 - priority).
    priority: u8,
}

const ROUTE_RULES: &[RouteRule] = &[
    RouteRule {
        name: "problem_solving",
        keywords: &[
            "优化", "性能", "问题", "解决", "修复", "bug", "optimize", "performance", "fix",
            "debug",
        ],
        vcp_preset: "deep",
        chain_key: "problem_solving",
        priority: 1,
    },
    RouteRule {
        name: "creative",
        keywords: &[
            "创意", "设计", "头脑风暴", "创新", "creative", "brainstorm", "design", "idea",
        ],
        vcp_preset: "creative",
        chain_key: "creative",
        priority: 2,
    },
    RouteRule {
        name: "decision",
        keywords: &[
            "选择", "决策", "对比", "方案", "decide", "choose", "compare", "trade-off",
        ],
        vcp_preset: "standard",
        chain_key: "decision",
        priority: 2,
    },
    RouteRule {
        name: "analysis",
        keywords: &[
            "学习", "理解", "分析", "原理", "explain", "understand", "analyze", "learn",
        ],
        vcp_preset: "standard",
        chain_key: "general",
        priority: 3,
    },
    RouteRule {
        name: "summary",
        keywords: &["总结", "梳理", "概括", "summarize", "summary", "recap"],
        vcp_preset: "quick",
        chain_key: "general",
        priority: 3,
    },
];

/// The route a topic resolved to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDecision {
    /// Matched rule name, or "fallback" when nothing matched.
    pub rule: String,
    /// Cluster preset the rule selects.
    pub vcp_preset: String,
    /// Chain config the rule selects.
    pub chain_key: String,
    /// Number of keywords that matched.
    pub matches: usize,
    /// Routing confidence in [0.5, 0.95].
    pub confidence: f64,
}

/// Score a topic against the rule list and pick the route.
///
/// Matching is case-insensitive substring containment; the score is
/// `matches * (4 - priority)` and ties keep the earliest-declared rule.
pub fn select_route(topic: &str) -> RouteDecision {
    let haystack = topic.to_lowercase();

    let mut best: Option<(&RouteRule, usize, usize)> = None;
    for rule in ROUTE_RULES {
        let matches = rule
            .keywords
            .iter()
            .filter(|k| haystack.contains(&k.to_lowercase()))
            .count();
        if matches == 0 {
            continue;
        }
        let score = matches * (4 - rule.priority as usize);
        // Strict > keeps the earliest rule on ties.
        if best.map(|(_, _, s)| score > s).unwrap_or(true) {
            best = Some((rule, matches, score));
        }
    }

    match best {
        Some((rule, matches, _)) => {
            let weight = (4 - rule.priority) as f64;
            let confidence =
                (0.5 + matches as f64 * 0.15 + weight * 0.1).min(CONFIDENCE_CAP);
            RouteDecision {
                rule: rule.name.to_string(),
                vcp_preset: rule.vcp_preset.to_string(),
                chain_key: rule.chain_key.to_string(),
                matches,
                confidence,
            }
        }
        None => RouteDecision {
            rule: "fallback".to_string(),
            vcp_preset: "standard".to_string(),
            chain_key: "general".to_string(),
            matches: 0,
            confidence: FALLBACK_CONFIDENCE,
        },
    }
}

/// Input parameters for routed reasoning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoRouteParams {
    /// The topic to route and reason about
    pub topic: String,
    /// Optional extra context (cluster path only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Execute the cluster route (true, default) or the chain route (false)
    #[serde(default = "default_prefer_vcp")]
    pub prefer_vcp: bool,
}

fn default_prefer_vcp() -> bool {
    true
}

impl AutoRouteParams {
    /// Create new params with just a topic
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            context: None,
            prefer_vcp: true,
        }
    }

    /// Attach extra context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Choose the chain path instead of the cluster path
    pub fn with_prefer_vcp(mut self, prefer_vcp: bool) -> Self {
        self.prefer_vcp = prefer_vcp;
        self
    }
}

/// What the routed execution produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoutedOutput {
    /// Cluster deliberation ran.
    Vcp(VcpResult),
    /// One-shot chain reasoning ran.
    Think(ThinkResult),
}

/// Result of routed reasoning: the decision plus the executed output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoRouteResult {
    pub route: RouteDecision,
    pub output: RoutedOutput,
}

/// Topic Router executing whichever engine the decision selects.
pub struct TopicRouter {
    chain_engine: Arc<ChainEngine>,
    vcp_engine: Arc<VcpEngine>,
}

impl TopicRouter {
    /// Create a new router over the two engines
    pub fn new(chain_engine: Arc<ChainEngine>, vcp_engine: Arc<VcpEngine>) -> Self {
        Self {
            chain_engine,
            vcp_engine,
        }
    }

    /// Route a topic and execute the selected strategy.
    pub async fn auto_route(&self, params: AutoRouteParams) -> AppResult<AutoRouteResult> {
        if params.topic.trim().is_empty() {
            return Err(AppError::validation("topic", "Topic cannot be empty"));
        }

        let route = select_route(&params.topic);
        info!(
            rule = %route.rule,
            vcp_preset = %route.vcp_preset,
            chain = %route.chain_key,
            confidence = route.confidence,
            "Topic routed"
        );

        let output = if params.prefer_vcp {
            let mut vcp = VcpParams::new(params.topic).with_chain(&route.vcp_preset);
            if let Some(context) = params.context {
                vcp = vcp.with_context(context);
            }
            RoutedOutput::Vcp(self.vcp_engine.think_vcp(vcp).await?)
        } else {
            let think = ThinkParams::new(params.topic)
                .with_chain(&route.chain_key)
                .with_depth(ThinkDepth::Normal);
            RoutedOutput::Think(self.chain_engine.think(think).await?)
        };

        Ok(AutoRouteResult { route, output })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_performance_topic_routes_deep() {
        let route = select_route("如何优化数据库查询性能");
        assert_eq!(route.rule, "problem_solving");
        assert_eq!(route.vcp_preset, "deep");
        assert_eq!(route.chain_key, "problem_solving");
        // 优化 + 性能 + 问题(substring of nothing here) -> at least 2 matches
        assert!(route.matches >= 2);
    }

    #[test]
    fn test_english_keywords_case_insensitive() {
        let route = select_route("Please DEBUG and FIX this");
        assert_eq!(route.rule, "problem_solving");
    }

    #[test]
    fn test_no_match_falls_back_at_half_confidence() {
        let route = select_route("天气如何");
        assert_eq!(route.rule, "fallback");
        assert_eq!(route.vcp_preset, "standard");
        assert_eq!(route.chain_key, "general");
        assert_eq!(route.confidence, 0.5);
        assert_eq!(route.matches, 0);
    }

    #[test]
    fn test_tie_keeps_declaration_order() {
        // "创意" (creative, priority 2) and "选择" (decision, priority 2) both
        // match once; equal scores keep the earlier rule.
        let route = select_route("为这个产品的创意做出选择");
        assert_eq!(route.rule, "creative");
    }

    #[test]
    fn test_priority_weights_the_score() {
        // One problem_solving keyword (weight 3) beats one summary keyword
        // (weight 1).
        let route = select_route("总结这个bug");
        assert_eq!(route.rule, "problem_solving");
    }

    #[test]
    fn test_confidence_formula_and_cap() {
        // Single priority-3 match: 0.5 + 0.15 + 0.1 = 0.75
        let route = select_route("帮我学习");
        assert_eq!(route.rule, "analysis");
        assert!((route.confidence - 0.75).abs() < 1e-9);

        // Many high-priority matches cap at 0.95.
        let route = select_route("优化性能 解决问题 修复bug debug fix optimize performance");
        assert_eq!(route.confidence, 0.95);
    }

    #[test]
    fn test_summary_topic_routes_quick() {
        let route = select_route("帮我总结一下这篇文章");
        assert_eq!(route.rule, "summary");
        assert_eq!(route.vcp_preset, "quick");
    }
}
