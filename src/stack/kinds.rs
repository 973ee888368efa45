//! Closed technology enums that make up a [`ProjectStack`](super::ProjectStack).
//!
//! Each enum serialises to its lowercase identifier and lists its members in
//! a fixed order. For [`Language`] that order is also the tie-break order
//! when two languages have the same file count.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $ident:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// All members in priority order.
            pub fn all() -> &'static [$name] {
                &[$($name::$variant),+]
            }

            /// Lowercase identifier, identical to the serialised form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $ident),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

closed_enum! {
    /// Smart-contract development framework.
    ContractFramework {
        Hardhat => "hardhat",
        Foundry => "foundry",
        Truffle => "truffle",
        Anchor => "anchor",
        Brownie => "brownie",
    }
}

closed_enum! {
    /// Server-side framework.
    BackendFramework {
        NestJs => "nestjs",
        Express => "express",
        Fastify => "fastify",
        Koa => "koa",
        FastApi => "fastapi",
        Django => "django",
        Flask => "flask",
        Axum => "axum",
        Actix => "actix",
    }
}

closed_enum! {
    /// Client-side framework.
    FrontendFramework {
        Next => "next",
        Nuxt => "nuxt",
        SvelteKit => "sveltekit",
        Angular => "angular",
        Remix => "remix",
        Vue => "vue",
        Svelte => "svelte",
        React => "react",
    }
}

closed_enum! {
    /// Primary implementation language.
    Language {
        TypeScript => "typescript",
        JavaScript => "javascript",
        Solidity => "solidity",
        Rust => "rust",
        Python => "python",
        Go => "go",
    }
}

closed_enum! {
    /// Dependency/package manager.
    PackageManager {
        Pnpm => "pnpm",
        Yarn => "yarn",
        Bun => "bun",
        Npm => "npm",
        Cargo => "cargo",
        Poetry => "poetry",
        Pip => "pip",
    }
}

impl Language {
    /// File extensions (without the dot) counted towards this language.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::TypeScript => &["ts", "tsx", "mts", "cts"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::Solidity => &["sol"],
            Language::Rust => &["rs"],
            Language::Python => &["py"],
            Language::Go => &["go"],
        }
    }

    /// Language for a file extension, if any.
    pub fn from_extension(ext: &str) -> Option<Language> {
        Language::all()
            .iter()
            .copied()
            .find(|lang| lang.extensions().contains(&ext))
    }
}
