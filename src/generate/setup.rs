//! Repository setup script and top-level Makefile.

use super::{Artifact, ArtifactKind, GenerateContext};

const UNIKRAFT_REPO: &str = "https://github.com/unikraft/unikraft";
const LIBRARY_REPO_PREFIX: &str = "https://github.com/unikraft/lib-";

/// `setup.sh`: clone Unikraft, the libraries and the template application.
pub fn setup_script(ctx: &GenerateContext<'_>) -> Artifact {
    let app = ctx.app;
    let mut script = String::from("#!/bin/sh\n\n");

    push_line!(
        script,
        "test -d workdir/unikraft || git clone {} workdir/unikraft",
        UNIKRAFT_REPO
    );

    if !app.libraries.is_empty() {
        push_line!(script);
        push_line!(script, "for l in {}; do", app.libraries.join(" "));
        push_line!(
            script,
            "    test -d workdir/libs/\"$l\" || git clone {}\"$l\" workdir/libs/\"$l\"",
            LIBRARY_REPO_PREFIX
        );
        push_line!(script, "done");
    }

    if let Some(ref template) = app.template {
        push_line!(script);
        push_line!(
            script,
            "test -d workdir/apps/{name} || git clone {} workdir/apps/{name}",
            template.source,
            name = template.name
        );
    }

    push_line!(script);
    push_line!(script, "ln -sfn workdir .unikraft");

    Artifact::new(
        ctx.layout.scripts_dir.join("setup.sh"),
        ArtifactKind::Setup,
        script,
    )
}

/// `Makefile` in the project root, forwarding to the Unikraft build.
pub fn makefile(ctx: &GenerateContext<'_>) -> Artifact {
    let app = ctx.app;
    let uk_app = match app.template {
        Some(ref template) => format!("$(PWD)/workdir/apps/{}", template.name),
        None => "$(PWD)".to_string(),
    };
    let libs = app
        .libraries
        .iter()
        .map(|l| format!("$(UK_LIBS)/{}", l))
        .collect::<Vec<_>>()
        .join(":");

    let mut makefile = String::new();
    push_line!(makefile, "UK_APP ?= {}", uk_app);
    push_line!(makefile, "UK_ROOT ?= $(PWD)/workdir/unikraft");
    push_line!(makefile, "UK_LIBS ?= $(PWD)/workdir/libs");
    push_line!(makefile, "UK_BUILD ?= $(PWD)/workdir/build");
    push_line!(makefile, "LIBS ?= {}", libs);
    push_line!(makefile);
    push_line!(makefile, "all:");
    push_line!(
        makefile,
        "\t@$(MAKE) -C $(UK_ROOT) A=$(UK_APP) L=$(LIBS) O=$(UK_BUILD)"
    );
    push_line!(makefile);
    push_line!(makefile, "$(MAKECMDGOALS):");
    push_line!(
        makefile,
        "\t@$(MAKE) -C $(UK_ROOT) A=$(UK_APP) L=$(LIBS) O=$(UK_BUILD) $(MAKECMDGOALS)"
    );

    Artifact::new(ctx.layout.makefile(), ArtifactKind::Makefile, makefile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::testing::{app, config, layout};

    const TEMPLATED: &str = r#"
name = "nginx"
template = "https://github.com/unikraft/app-elfloader.git"
targets = ["qemu/x86_64"]

[libraries.musl]
[libraries.lwip]
"#;

    #[test]
    fn test_setup_without_libraries() {
        let app = app("targets = [\"qemu/x86_64\"]\nname = \"bare\"\n");
        let config = config();
        let layout = layout(&config);
        let ctx = GenerateContext {
            app: &app,
            config: &config,
            layout: &layout,
        };

        let script = setup_script(&ctx);
        assert!(script.is_executable());
        assert_eq!(
            script.contents,
            "#!/bin/sh\n\n\
             test -d workdir/unikraft || git clone https://github.com/unikraft/unikraft workdir/unikraft\n\n\
             ln -sfn workdir .unikraft\n"
        );
        assert!(makefile(&ctx).contents.contains("UK_APP ?= $(PWD)\n"));
        assert!(makefile(&ctx).contents.contains("LIBS ?= \n"));
    }

    #[test]
    fn test_setup_with_template() {
        let app = app(TEMPLATED);
        let config = config();
        let layout = layout(&config);
        let ctx = GenerateContext {
            app: &app,
            config: &config,
            layout: &layout,
        };

        let script = setup_script(&ctx).contents;
        assert!(script.contains("for l in musl lwip; do\n"));
        assert!(script.contains(
            "test -d workdir/apps/elfloader || git clone https://github.com/unikraft/app-elfloader.git workdir/apps/elfloader\n"
        ));

        let makefile = makefile(&ctx);
        assert!(!makefile.is_executable());
        assert!(makefile
            .contents
            .contains("UK_APP ?= $(PWD)/workdir/apps/elfloader\n"));
        assert!(makefile
            .contents
            .contains("LIBS ?= $(UK_LIBS)/musl:$(UK_LIBS)/lwip\n"));
        assert!(makefile.contents.contains(
            "$(MAKECMDGOALS):\n\t@$(MAKE) -C $(UK_ROOT) A=$(UK_APP) L=$(LIBS) O=$(UK_BUILD) $(MAKECMDGOALS)\n"
        ));
    }
}
