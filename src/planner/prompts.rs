//! Prompt templates for the planner's four operations

/// System prompt for decomposition
pub const PLANNING_SYSTEM: &str = "You are a task planning expert. Your job is to break complex tasks into executable sub-tasks.

Rules:
1. Analyse the task's complexity and dependencies
2. Choose the right execution mode (sequential/parallel)
3. Reply with strict JSON";

/// System prompt for leaf execution
pub const EXECUTION_SYSTEM: &str = "You are a task execution assistant.

Rules:
1. Use the available tools to complete the task
2. After tool calls, reply with a concise result";

/// System prompt for result synthesis
pub const SYNTHESIS_SYSTEM: &str = "You are an expert at consolidating results.";

/// System prompt for verification
pub const VERIFICATION_SYSTEM: &str = "You are a task verification expert. Your job is to check whether an execution result meets the stated goal.

Rules:
1. Check carefully that the result fully satisfies the task goal
2. If verification passes, your reply MUST contain \"VERIFICATION_PASSED\"
3. If it fails, explain why and suggest improvements
4. Be reasonable; do not demand perfection";

/// Build the decomposition prompt for a node
pub fn node_planning(title: &str, description: &str, goal: &str, context: &str, tools: &str) -> String {
    format!(
        r#"Break the following task into sub-tasks.

## Task
Title: {title}
Description: {description}
Goal: {goal}

## Context
{context}

## Available tools
{tools}

## Rules
1. 1-10 sub-tasks
2. Prefer parallel execution: default execution_mode to "parallel"
3. Choose "sequential" only when sub-tasks clearly depend on each other
4. can_decompose: true marks a complex sub-task that may be split further
5. For a simple task, return an empty subtasks array

## Reply with JSON (no markdown code fences)
{{
  "title": "task title",
  "goal": "expected goal",
  "execution_mode": "parallel",
  "subtasks": [
    {{
      "title": "sub-task title",
      "description": "detailed description",
      "goal": "sub-task goal",
      "tools": ["tool name"],
      "can_decompose": false
    }}
  ],
  "reasoning": "why this execution mode"
}}"#
    )
}

/// Build the leaf execution prompt for a node
pub fn node_execution(title: &str, description: &str, goal: &str, context: &str) -> String {
    format!(
        r#"Execute the following task and report the result.

## Task
Title: {title}
Description: {description}
Goal: {goal}

## Context
{context}

## Rules
1. Use the available tools to complete the task
2. Reply with a clear, concise result
3. Use the save_to_disk tool for content that should persist"#
    )
}

/// Build the synthesis prompt merging child results for a parent
pub fn result_synthesis(title: &str, goal: &str, child_results: &str) -> String {
    format!(
        r#"Merge the following sub-task results into one coherent final result.

## Parent task
Title: {title}
Goal: {goal}

## Sub-task results
{child_results}

## Rules
1. Extract the key information
2. Merge related content
3. Reply with a concise result summary"#
    )
}

/// Build the verification prompt for a result
pub fn verification(title: &str, goal: &str, result: &str) -> String {
    format!(
        r#"Verify whether the following execution result meets the task goal.

## Original task
Title: {title}
Goal: {goal}

## Execution result
{result}

## Checks
1. Does the result fully satisfy the task goal?
2. Is anything missing or wrong?
3. Is the output format correct?

## Reply format
If verification passes, include: VERIFICATION_PASSED
If it fails, state:
- why it fails
- concrete suggestions for improvement"#
    )
}

/// Build the revision prompt asking for an improved result
pub fn revision(title: &str, goal: &str, current_result: &str, feedback: &str) -> String {
    format!(
        r#"Improve the task result according to the verification feedback below.

## Original task
Title: {title}
Goal: {goal}

## Current result
{current_result}

## Verification feedback
{feedback}

Revise the result so it satisfies the task goal."#
    )
}
