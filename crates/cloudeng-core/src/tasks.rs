//! Predefined task registry.

/// A canned request offered in the task menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredefinedTask {
    pub key: &'static str,
    pub description: &'static str,
}

impl PredefinedTask {
    /// Text recorded as the user's message when the task is run.
    pub fn user_prompt(&self) -> String {
        format!("Please {}", self.description.to_lowercase())
    }
}

const PREDEFINED_TASKS: &[PredefinedTask] = &[
    PredefinedTask {
        key: "ec2_status",
        description: "List all EC2 instances and their status",
    },
    PredefinedTask {
        key: "s3_buckets",
        description: "List all S3 buckets and their creation dates",
    },
    PredefinedTask {
        key: "cloudwatch_alarms",
        description: "Check for any CloudWatch alarms in ALARM state",
    },
    PredefinedTask {
        key: "iam_users",
        description: "List all IAM users and their last activity",
    },
    PredefinedTask {
        key: "security_groups",
        description: "Analyze security groups for potential vulnerabilities",
    },
    PredefinedTask {
        key: "cost_optimization",
        description: "Identify resources that could be optimized for cost",
    },
    PredefinedTask {
        key: "lambda_functions",
        description: "List all Lambda functions and their runtime",
    },
    PredefinedTask {
        key: "rds_instances",
        description: "Check status of all RDS instances",
    },
    PredefinedTask {
        key: "vpc_analysis",
        description: "Analyze VPC configuration and suggest improvements",
    },
    PredefinedTask {
        key: "ebs_volumes",
        description: "Find unattached EBS volumes that could be removed",
    },
    PredefinedTask {
        key: "generate_diagram",
        description: "Generate AWS architecture diagrams based on user description",
    },
];

/// All tasks in menu order.
pub fn all() -> &'static [PredefinedTask] {
    PREDEFINED_TASKS
}

/// Exact key lookup.
pub fn find(key: &str) -> Option<&'static PredefinedTask> {
    PREDEFINED_TASKS.iter().find(|task| task.key == key)
}

/// Looks a task up by key (case-insensitive) or by its 1-based menu number.
pub fn resolve(selector: &str) -> Option<&'static PredefinedTask> {
    let selector = selector.trim();
    if let Ok(index) = selector.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| PREDEFINED_TASKS.get(i));
    }
    PREDEFINED_TASKS
        .iter()
        .find(|task| task.key.eq_ignore_ascii_case(selector))
}
