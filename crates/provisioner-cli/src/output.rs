use provisioner_domain::{LaunchRecord, NodeRecord};

/// Render a launch and its nodes as human-readable text.
pub fn render_launch(launch: &LaunchRecord, nodes: &[NodeRecord]) -> String {
    let mut out = String::new();
    out.push_str(&format!("launch {} [{}]\n", launch.launch_id, launch.state));
    if let Some(desc) = &launch.state_desc {
        out.push_str(&format!("  state_desc: {desc}\n"));
    }
    if let Some(context) = &launch.context {
        out.push_str(&format!("  context: {}\n", context.uri));
    }

    for node in nodes {
        out.push_str(&format!(
            "  node {} [{}] site={} group={}",
            node.node_id, node.state, node.site, node.ctx_name
        ));
        if let Some(ip) = &node.public_ip {
            out.push_str(&format!(" ip={ip}"));
        }
        if let Some(desc) = &node.state_desc {
            out.push_str(&format!(" desc={desc}"));
        }
        out.push('\n');
    }

    out
}
