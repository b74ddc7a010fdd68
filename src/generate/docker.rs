//! Root filesystems built from a Dockerfile.
//!
//! The image is built and its filesystem exported into the rootfs
//! directory before a script packs or shares it.

use std::path::PathBuf;

use crate::core::manifest::AppManifest;

use super::{Artifact, ArtifactKind, GenerateContext, OutputLayout};

fn image_name(app: &AppManifest) -> String {
    format!("unikraft-{}", app.name)
}

fn makefile_path(layout: &OutputLayout) -> PathBuf {
    layout.scripts_dir.join("docker").join("docker.Makefile")
}

/// `docker/docker.Makefile`: build the image and export it as the rootfs.
pub fn docker_makefile(ctx: &GenerateContext<'_>) -> Option<Artifact> {
    let app = ctx.app;
    let dockerfile = app.dockerfile.as_deref()?;
    let rootfs = app.rootfs.as_deref()?;

    let mut makefile = String::new();
    push_line!(makefile, "IMAGE_NAME ?= {}", image_name(app));
    push_line!(makefile, "DOCKERFILE ?= {}", dockerfile);
    push_line!(makefile, "ROOTFS ?= {}", rootfs);
    push_line!(makefile, "CONTAINER ?= $(IMAGE_NAME)-export");
    push_line!(makefile);
    push_line!(makefile, ".PHONY: build export");
    push_line!(makefile);
    push_line!(makefile, "build:");
    push_line!(
        makefile,
        "\tdocker build -f $(DOCKERFILE) -t $(IMAGE_NAME) $(dir $(DOCKERFILE))"
    );
    push_line!(makefile);
    push_line!(makefile, "export: build");
    push_line!(makefile, "\trm -fr $(ROOTFS)");
    push_line!(makefile, "\tmkdir -p $(ROOTFS)");
    push_line!(makefile, "\t-docker rm -f $(CONTAINER) > /dev/null 2>&1");
    // Images built from scratch have no default command
    push_line!(makefile, "\tdocker create --name $(CONTAINER) $(IMAGE_NAME) /init");
    push_line!(makefile, "\tdocker export $(CONTAINER) | tar -x -C $(ROOTFS)");
    push_line!(makefile, "\tdocker rm $(CONTAINER)");

    Some(Artifact::new(
        makefile_path(ctx.layout),
        ArtifactKind::Docker,
        makefile,
    ))
}

/// Shell line refreshing the exported rootfs, if the application has a
/// Dockerfile.
pub fn export_command(ctx: &GenerateContext<'_>) -> Option<String> {
    ctx.app.dockerfile.as_ref()?;
    Some(format!(
        "IMAGE_NAME={} make -f {} export",
        image_name(ctx.app),
        ctx.layout.relative(&makefile_path(ctx.layout))
    ))
}

/// Append the export step to `script`, if the application has a Dockerfile.
pub(crate) fn write_export(script: &mut String, ctx: &GenerateContext<'_>) {
    if let Some(command) = export_command(ctx) {
        push_line!(script);
        push_line!(script, "# Export the Docker image filesystem.");
        push_line!(script, "{}", command);
    }
}
