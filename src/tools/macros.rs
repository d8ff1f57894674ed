//! Tool Declaration Macros
//!
//! Keeps adapter declarations short and uniform

/// Build a [`ToolDeclaration`](crate::tools::ToolDeclaration) declaratively
///
/// # Example
/// ```
/// let declaration = floodwatch::tool_declaration! {
///     name: "send_notification",
///     description: "Show an alert banner to the user",
///     parameters: [
///         {
///             name: "message",
///             type: "string",
///             description: "Alert text",
///             required: true
///         },
///         {
///             name: "severity",
///             type: "string",
///             description: "Alert severity",
///             required: false,
///             allowed: ["info", "warning", "critical"]
///         }
///     ]
/// };
/// assert_eq!(declaration.parameters.len(), 2);
/// ```
#[macro_export]
macro_rules! tool_declaration {
    (
        name: $name:expr,
        description: $description:expr,
        parameters: [
            $(
                {
                    name: $param_name:expr,
                    type: $param_type:expr,
                    description: $param_desc:expr,
                    required: $param_required:expr
                    $(, allowed: [$($allowed:expr),* $(,)?])?
                    $(,)?
                }
            ),* $(,)?
        ]
    ) => {
        $crate::tools::ToolDeclaration {
            name: $name.to_string(),
            description: $description.to_string(),
            parameters: vec![
                $(
                    $crate::tools::ToolParameter {
                        name: $param_name.to_string(),
                        param_type: $param_type.to_string(),
                        description: $param_desc.to_string(),
                        required: $param_required,
                        allowed: vec![$($($allowed.to_string()),*)?],
                    }
                ),*
            ],
        }
    };
}
