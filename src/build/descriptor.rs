// ABOUTME: Dockerfile synthesis for repositories that ship none.
// ABOUTME: Pure text generation; writing it to disk is the builder's job.

use std::collections::BTreeSet;

/// File name the builder looks for and writes.
pub const DOCKERFILE: &str = "Dockerfile";

/// Inputs to a synthesized Dockerfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorSpec<'a> {
    pub base_image: &'a str,
    pub build_command: &'a str,
    pub start_command: &'a str,
    /// Names declared as `ARG` so build args reach `RUN`.
    pub build_args: BTreeSet<&'a str>,
}

/// Render a minimal Dockerfile: base image, full workspace copy, optional
/// build step, optional start command.
pub fn synthesize_dockerfile(spec: &DescriptorSpec<'_>) -> String {
    let mut lines = vec![format!("FROM {}", spec.base_image), "WORKDIR /app".to_string()];

    lines.extend(spec.build_args.iter().map(|key| format!("ARG {key}")));
    lines.push("COPY . .".to_string());

    let build = spec.build_command.trim();
    if !build.is_empty() {
        lines.push(format!("RUN {build}"));
    }

    let start = spec.start_command.trim();
    if !start.is_empty() {
        lines.push(format!(
            "CMD [\"/bin/sh\",\"-c\",{}]",
            serde_json::Value::String(start.to_string())
        ));
    }

    let mut dockerfile = lines.join("\n");
    dockerfile.push('\n');
    dockerfile
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec<'a>(build: &'a str, start: &'a str, args: &[&'a str]) -> DescriptorSpec<'a> {
        DescriptorSpec {
            base_image: "node:20-alpine",
            build_command: build,
            start_command: start,
            build_args: args.iter().copied().collect(),
        }
    }

    #[test]
    fn full_descriptor() {
        let dockerfile = synthesize_dockerfile(&spec("npm install", "npm start", &["PORT"]));
        assert_eq!(
            dockerfile,
            "FROM node:20-alpine\n\
             WORKDIR /app\n\
             ARG PORT\n\
             COPY . .\n\
             RUN npm install\n\
             CMD [\"/bin/sh\",\"-c\",\"npm start\"]\n"
        );
    }

    #[test]
    fn empty_commands_are_omitted() {
        let dockerfile = synthesize_dockerfile(&spec("", "  ", &[]));
        assert!(!dockerfile.contains("RUN"));
        assert!(!dockerfile.contains("CMD"));
        assert!(dockerfile.ends_with("COPY . .\n"));
    }

    #[test]
    fn args_are_sorted() {
        let dockerfile = synthesize_dockerfile(&spec("", "", &["ZED", "ALPHA"]));
        let alpha = dockerfile.find("ARG ALPHA").unwrap();
        let zed = dockerfile.find("ARG ZED").unwrap();
        assert!(alpha < zed);
    }

    #[test]
    fn start_command_is_json_escaped() {
        let dockerfile = synthesize_dockerfile(&spec("", r#"echo "hi" \ there"#, &[]));
        assert!(dockerfile.contains(r#"CMD ["/bin/sh","-c","echo \"hi\" \\ there"]"#));
    }
}
