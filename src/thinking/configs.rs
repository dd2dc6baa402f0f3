//! Compiled-in chain configs, cluster catalog and cluster presets.
//!
//! Presets are immutable at runtime: the topic router and the orchestrators
//! select one by key, they never mutate one. Cluster names are kept in
//! Chinese, matching the preset catalog the renderer ships with.

use super::types::{ChainConfig, ClusterPreset, ClusterSpec, PhaseConfig};

/// Default single-chain preset key.
pub const DEFAULT_CHAIN_KEY: &str = "general";

/// Default cluster preset key.
pub const DEFAULT_CLUSTER_PRESET_KEY: &str = "standard";

/// All compiled-in single-chain presets.
pub fn builtin_chain_configs() -> Vec<ChainConfig> {
    vec![
        general_chain(),
        problem_solving_chain(),
        creative_chain(),
        decision_chain(),
    ]
}

/// Look up a chain config by key.
pub fn find_chain_config(key: &str) -> Option<ChainConfig> {
    builtin_chain_configs().into_iter().find(|c| c.key == key)
}

/// Keys of all chain presets, for validation error messages.
pub fn chain_config_keys() -> Vec<String> {
    builtin_chain_configs().into_iter().map(|c| c.key).collect()
}

/// All compiled-in cluster presets.
pub fn builtin_cluster_presets() -> Vec<ClusterPreset> {
    vec![
        quick_preset(),
        standard_preset(),
        deep_preset(),
        creative_preset(),
    ]
}

/// Look up a cluster preset by key.
pub fn find_cluster_preset(key: &str) -> Option<ClusterPreset> {
    builtin_cluster_presets().into_iter().find(|p| p.key == key)
}

/// Keys of all cluster presets, for validation error messages.
pub fn cluster_preset_keys() -> Vec<String> {
    builtin_cluster_presets().into_iter().map(|p| p.key).collect()
}

/// Look up a cluster stance by name.
pub fn find_cluster_spec(name: &str) -> Option<ClusterSpec> {
    cluster_catalog().into_iter().find(|c| c.name == name)
}

/// The catalog of reasoning stances cluster presets can reference.
pub fn cluster_catalog() -> Vec<ClusterSpec> {
    vec![
        ClusterSpec {
            name: "知识检索簇".to_string(),
            guidance: "回忆与主题相关的事实、概念与先例。只陈述可靠的已知信息，明确标注不确定之处。"
                .to_string(),
        },
        ClusterSpec {
            name: "逻辑推理簇".to_string(),
            guidance: "对主题进行严密的逻辑推理：分解前提、逐步推导、指出因果链条中的薄弱环节。"
                .to_string(),
        },
        ClusterSpec {
            name: "发散思维簇".to_string(),
            guidance: "跳出常规框架，提出非显而易见的角度、类比和备选方案，数量优先于稳妥。"
                .to_string(),
        },
        ClusterSpec {
            name: "批判反思簇".to_string(),
            guidance: "审视此前的推理：找出隐含假设、反例与风险，指出哪些结论经不起推敲。"
                .to_string(),
        },
        ClusterSpec {
            name: "陈词总结梳理簇".to_string(),
            guidance: "综合此前所有簇的输出，梳理出条理清晰的最终陈词：结论、依据、下一步行动。"
                .to_string(),
        },
    ]
}

fn general_chain() -> ChainConfig {
    ChainConfig {
        key: "general".to_string(),
        name: "General Analysis".to_string(),
        description: "Balanced observe-analyze-conclude walk for arbitrary topics".to_string(),
        phases: vec![
            PhaseConfig::new(
                "observation",
                "Lay out what is actually known about the topic: the facts, the constraints, and what remains unclear.",
            ),
            PhaseConfig::new(
                "analysis",
                "Break the topic into its parts and examine how they interact. Identify the forces that matter most.",
            ),
            PhaseConfig::new(
                "synthesis",
                "Combine the analysis into a coherent view. Resolve tensions between the parts where possible.",
            ),
            PhaseConfig::new(
                "conclusion",
                "State the final position plainly, with the key supporting reasons and any caveats.",
            )
            .with_bounds(1, 2),
        ],
    }
}

fn problem_solving_chain() -> ChainConfig {
    ChainConfig {
        key: "problem_solving".to_string(),
        name: "Problem Solving".to_string(),
        description: "Diagnose a problem and converge on an actionable fix".to_string(),
        phases: vec![
            PhaseConfig::new(
                "problem_definition",
                "Restate the problem precisely: symptoms, scope, and success criteria. Separate the problem from its suspected causes.",
            ),
            PhaseConfig::new(
                "root_cause",
                "Work backwards from the symptoms to candidate root causes. Rank them by likelihood and by how cheaply they can be tested.",
            ),
            PhaseConfig::new(
                "solution_generation",
                "Propose concrete solutions for the leading causes, including at least one low-risk incremental option.",
            ),
            PhaseConfig::new(
                "evaluation",
                "Weigh the proposed solutions against cost, risk and reversibility. Pick one and justify the pick.",
            )
            .with_bounds(1, 2),
            PhaseConfig::new(
                "conclusion",
                "Summarize the chosen fix as an actionable plan with verification steps.",
            )
            .with_bounds(1, 2),
        ],
    }
}

fn creative_chain() -> ChainConfig {
    ChainConfig {
        key: "creative".to_string(),
        name: "Creative Exploration".to_string(),
        description: "Diverge widely before converging on the strongest idea".to_string(),
        phases: vec![
            PhaseConfig::new(
                "divergence",
                "Generate many distinct ideas without judging them. Favor unexpected angles and cross-domain analogies.",
            )
            .with_bounds(1, 4),
            PhaseConfig::new(
                "combination",
                "Combine and mutate the strongest fragments from the previous ideas into fuller concepts.",
            ),
            PhaseConfig::new(
                "selection",
                "Judge the concepts on novelty and feasibility, and develop the winner into a concrete proposal.",
            )
            .with_bounds(1, 2),
        ],
    }
}

fn decision_chain() -> ChainConfig {
    ChainConfig {
        key: "decision".to_string(),
        name: "Decision Making".to_string(),
        description: "Structure a choice between competing options".to_string(),
        phases: vec![
            PhaseConfig::new(
                "framing",
                "Frame the decision: the options on the table, the stakeholders, and the criteria that matter.",
            ),
            PhaseConfig::new(
                "comparison",
                "Compare the options criterion by criterion. Make trade-offs explicit rather than averaging them away.",
            ),
            PhaseConfig::new(
                "recommendation",
                "Recommend one option with the decisive reasons, and name the conditions under which the recommendation flips.",
            )
            .with_bounds(1, 2),
        ],
    }
}

fn quick_preset() -> ClusterPreset {
    ClusterPreset {
        key: "quick".to_string(),
        description: "Fast two-stance pass: reason, then summarize".to_string(),
        clusters: vec!["逻辑推理簇".to_string(), "陈词总结梳理簇".to_string()],
        k_sequence: vec![1, 1],
    }
}

fn standard_preset() -> ClusterPreset {
    ClusterPreset {
        key: "standard".to_string(),
        description: "Balanced three-stance deliberation".to_string(),
        clusters: vec![
            "逻辑推理簇".to_string(),
            "批判反思簇".to_string(),
            "陈词总结梳理簇".to_string(),
        ],
        k_sequence: vec![1, 1, 1],
    }
}

fn deep_preset() -> ClusterPreset {
    ClusterPreset {
        key: "deep".to_string(),
        description: "Thorough five-stance deliberation with iterated middle stances".to_string(),
        clusters: vec![
            "知识检索簇".to_string(),
            "逻辑推理簇".to_string(),
            "发散思维簇".to_string(),
            "批判反思簇".to_string(),
            "陈词总结梳理簇".to_string(),
        ],
        k_sequence: vec![1, 2, 2, 2, 1],
    }
}

fn creative_preset() -> ClusterPreset {
    ClusterPreset {
        key: "creative".to_string(),
        description: "Divergence-led deliberation for idea generation".to_string(),
        clusters: vec![
            "发散思维簇".to_string(),
            "逻辑推理簇".to_string(),
            "陈词总结梳理簇".to_string(),
        ],
        k_sequence: vec![2, 1, 1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keys_resolve() {
        assert!(find_chain_config(DEFAULT_CHAIN_KEY).is_some());
        assert!(find_cluster_preset(DEFAULT_CLUSTER_PRESET_KEY).is_some());
    }

    #[test]
    fn test_quick_preset_shape() {
        let quick = find_cluster_preset("quick").unwrap();
        assert_eq!(quick.clusters, vec!["逻辑推理簇", "陈词总结梳理簇"]);
        assert_eq!(quick.k_sequence, vec![1, 1]);
    }

    #[test]
    fn test_every_preset_cluster_is_in_catalog() {
        for preset in builtin_cluster_presets() {
            for cluster in &preset.clusters {
                assert!(
                    find_cluster_spec(cluster).is_some(),
                    "preset {} references unknown cluster {}",
                    preset.key,
                    cluster
                );
            }
        }
    }

    #[test]
    fn test_chain_config_keys_unique() {
        let mut keys = chain_config_keys();
        let before = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), before);
    }

    #[test]
    fn test_problem_solving_chain_exists() {
        let config = find_chain_config("problem_solving").unwrap();
        assert_eq!(config.phases.first().unwrap().name, "problem_definition");
        assert!(config.is_last_phase("conclusion"));
    }

    #[test]
    fn test_deep_preset_pairs_k_with_clusters() {
        let deep = find_cluster_preset("deep").unwrap();
        assert_eq!(deep.clusters.len(), deep.k_sequence.len());
        assert_eq!(deep.iterations_for(1), 2);
        assert_eq!(deep.iterations_for(4), 1);
    }
}
