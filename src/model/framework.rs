use serde::Serialize;
use strum_macros::{EnumIter, IntoStaticStr};

/// CMS or front-end platform recognized from markup signatures
///
/// Variants are declared in matching priority order: when markers of
/// several platforms appear, the first variant wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, EnumIter, IntoStaticStr,
)]
pub enum Framework {
    Tilda,
    Wix,
    React,
    #[serde(rename = "Vue.js")]
    #[strum(serialize = "Vue.js")]
    VueJs,
    Angular,
    WordPress,
    Bitrix,
    #[serde(rename = "1C-Bitrix")]
    #[strum(serialize = "1C-Bitrix")]
    OneCBitrix,
    Joomla,
    Drupal,
    Shopify,
    Squarespace,
    Webflow,
    Modx,
}

impl Framework {
    /// Lower-case substrings whose presence identifies the platform
    pub fn markers(self) -> &'static [&'static str] {
        match self {
            Self::Tilda => &["tilda", "t-body", "t-records", "t-store"],
            Self::Wix => &["wix.com", "_wix", "wixsite"],
            Self::React => &["__next_data__", "_next/", "react-root", "__next"],
            Self::VueJs => &["__vue__", "v-app", "nuxt"],
            Self::Angular => &["ng-version", "ng-app"],
            Self::WordPress => &["wp-content", "wp-includes", "wordpress"],
            Self::Bitrix => &["bitrix", "bx-panel"],
            Self::OneCBitrix => &["1c-bitrix"],
            Self::Joomla => &["joomla", "/components/com_"],
            Self::Drupal => &["drupal", "sites/default/files"],
            Self::Shopify => &["shopify", "cdn.shopify.com"],
            Self::Squarespace => &["squarespace"],
            Self::Webflow => &["webflow"],
            Self::Modx => &["modx", "assets/components"],
        }
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}
