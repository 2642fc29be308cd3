//! # Tree Command Implementation
//!
//! This module implements the `tree` subcommand, which displays a pallet's
//! merged file tree: its own files plus everything it imports, with each
//! imported file annotated by the chain of pallets it came through.
//!
//! This command is a safe, read-only operation that does not modify any files.

use std::borrow::Cow;
use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};

use palletfs::cache::PalletCache;
use palletfs::fs::PathedFs;
use palletfs::imports::merge_fs_pallet_imports;
use palletfs::mergefs::FileRef;
use palletfs::output::OutputConfig;
use palletfs::path;

use super::Context;

/// Display the merged file tree of a pallet
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Pallet path, e.g. github.com/org/repo
    #[arg(value_name = "PALLET_PATH")]
    pub pallet: String,

    /// Pallet version
    #[arg(value_name = "VERSION")]
    pub version: String,

    /// Directory within the pallet to start from
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: String,

    /// Maximum depth to display in the tree.
    ///
    /// If not specified, displays the full tree.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,
}

/// Execute the `tree` command.
pub fn execute(args: TreeArgs, ctx: &Context) -> Result<()> {
    let pallet = ctx
        .cache
        .load_fs_pallet(&args.pallet, &args.version)
        .map_err(|e| anyhow::anyhow!("Failed to load pallet {}@{}: {}", args.pallet, args.version, e))?;
    let (merged, imports) = merge_fs_pallet_imports(&pallet, &ctx.cache)
        .map_err(|e| anyhow::anyhow!("Failed to resolve imports of {}: {}", pallet.path_version(), e))?;

    let dir = path::clean(&args.dir)?;
    let builder = TreeBuilder {
        fs: merged.fs.as_ref(),
        imports: &imports,
        output: &ctx.output,
        max_depth: args.depth.unwrap_or(usize::MAX),
    };
    let mut root = builder.build(&dir, 0)?;
    if dir == path::ROOT {
        root.label = ctx.output.label(merged.path(), &merged.version);
    }
    print_tree(&root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    Ok(())
}

struct TreeBuilder<'a> {
    fs: &'a dyn PathedFs,
    imports: &'a BTreeMap<String, FileRef>,
    output: &'a OutputConfig,
    max_depth: usize,
}

impl TreeBuilder<'_> {
    fn build(&self, name: &str, depth: usize) -> Result<TreeNode> {
        let info = palletfs::fs::stat_maybe_link(self.fs, name)?;
        let base = if name == path::ROOT { name } else { path::base(name) };

        if info.is_dir() {
            let mut children = Vec::new();
            if depth < self.max_depth {
                for entry in self.fs.read_dir(name)? {
                    children.push(self.build(&path::join(name, entry.name()), depth + 1)?);
                }
            }
            return Ok(TreeNode {
                label: self.output.dir(base),
                children,
            });
        }

        let mut label = base.to_string();
        if info.is_symlink() {
            if let Some(link_fs) = self.fs.as_read_link() {
                label = format!("{} -> {}", label, link_fs.read_link(name)?);
            }
        }
        if let Some(file_ref) = self.imports.get(name) {
            label = format!(
                "{}  {}",
                label,
                self.output
                    .note(format_args!("(from {})", file_ref.sources.join(" -> ")))
            );
        }
        Ok(TreeNode {
            label,
            children: Vec::new(),
        })
    }
}

/// Tree node structure for ptree visualization
#[derive(Clone, Debug)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palletfs::cache::{LayeredPalletCache, PalletOverrideCache};
    use palletfs::fs::MemoryFs;
    use palletfs::pallet::FsPallet;
    use std::sync::Arc;

    fn pallet(path: &str, extra: &str, files: &[&str]) -> Arc<FsPallet> {
        let mut fs = MemoryFs::with_path(format!("/src/{}", path));
        fs.add_file_string("pallet.yml", &format!("pallet:\n  path: {}\n{}", path, extra))
            .unwrap();
        for name in files {
            fs.add_file_string(name, "x").unwrap();
        }
        Arc::new(FsPallet::from_fs(Arc::new(fs)).unwrap().with_version("v1"))
    }

    fn render(node: &TreeNode) -> String {
        let mut out = Vec::new();
        ptree::write_tree(node, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_tree_annotates_imports() {
        let base = pallet("github.com/org/base", "", &["deploy/web.yml"]);
        let app = pallet(
            "github.com/org/app",
            "imports:\n  - pallet: github.com/org/base\n    version: v1\n",
            &["README.md"],
        );
        let cache = LayeredPalletCache {
            underlay: Some(Arc::new(PalletOverrideCache::from_pallets([
                (base, vec!["v1".to_string()]),
                (app.clone(), vec!["v1".to_string()]),
            ]))),
            overlay: None,
        };
        let (merged, imports) = merge_fs_pallet_imports(&app, &cache).unwrap();
        let output = OutputConfig::without_color();
        let builder = TreeBuilder {
            fs: merged.fs.as_ref(),
            imports: &imports,
            output: &output,
            max_depth: usize::MAX,
        };

        let text = render(&builder.build(".", 0).unwrap());
        assert!(text.contains("README.md"));
        assert!(text.contains("web.yml  (from github.com/org/base@v1)"));
        assert!(!text.contains("README.md  (from"));

        let shallow = TreeBuilder { max_depth: 1, ..builder };
        let text = render(&shallow.build(".", 0).unwrap());
        assert!(text.contains("deploy"));
        assert!(!text.contains("web.yml"));
    }
}
