//! Deterministic word list used to generate human-readable room codes.
//!
//! Entries are `adjective-noun` pairs so codes like `"amber-falcon jade-ridge
//! misty-harbor"` are easy to read aloud. The list is fixed at compile time:
//! `len(WORDLIST) == 1024`, sampling is uniform over the whole list, and
//! iteration order never changes between builds.

pub const WORDLIST: &[&str] = &[
    "amber-falcon", "amber-otter", "amber-willow", "amber-canyon",
    "amber-harbor", "amber-lantern", "amber-meadow", "amber-river",
    "amber-summit", "amber-thicket", "amber-anchor", "amber-beacon",
    "amber-cedar", "amber-delta", "amber-ember", "amber-forge",
    "amber-glacier", "amber-haven", "amber-island", "amber-juniper",
    "amber-kestrel", "amber-ledge", "amber-marsh", "amber-nimbus",
    "amber-orchard", "amber-prairie", "amber-quarry", "amber-ridge",
    "amber-saddle", "amber-tundra", "amber-valley", "amber-wharf",
    "azure-falcon", "azure-otter", "azure-willow", "azure-canyon",
    "azure-harbor", "azure-lantern", "azure-meadow", "azure-river",
    "azure-summit", "azure-thicket", "azure-anchor", "azure-beacon",
    "azure-cedar", "azure-delta", "azure-ember", "azure-forge",
    "azure-glacier", "azure-haven", "azure-island", "azure-juniper",
    "azure-kestrel", "azure-ledge", "azure-marsh", "azure-nimbus",
    "azure-orchard", "azure-prairie", "azure-quarry", "azure-ridge",
    "azure-saddle", "azure-tundra", "azure-valley", "azure-wharf",
    "bold-falcon", "bold-otter", "bold-willow", "bold-canyon",
    "bold-harbor", "bold-lantern", "bold-meadow", "bold-river",
    "bold-summit", "bold-thicket", "bold-anchor", "bold-beacon",
    "bold-cedar", "bold-delta", "bold-ember", "bold-forge",
    "bold-glacier", "bold-haven", "bold-island", "bold-juniper",
    "bold-kestrel", "bold-ledge", "bold-marsh", "bold-nimbus",
    "bold-orchard", "bold-prairie", "bold-quarry", "bold-ridge",
    "bold-saddle", "bold-tundra", "bold-valley", "bold-wharf",
    "brave-falcon", "brave-otter", "brave-willow", "brave-canyon",
    "brave-harbor", "brave-lantern", "brave-meadow", "brave-river",
    "brave-summit", "brave-thicket", "brave-anchor", "brave-beacon",
    "brave-cedar", "brave-delta", "brave-ember", "brave-forge",
    "brave-glacier", "brave-haven", "brave-island", "brave-juniper",
    "brave-kestrel", "brave-ledge", "brave-marsh", "brave-nimbus",
    "brave-orchard", "brave-prairie", "brave-quarry", "brave-ridge",
    "brave-saddle", "brave-tundra", "brave-valley", "brave-wharf",
    "bright-falcon", "bright-otter", "bright-willow", "bright-canyon",
    "bright-harbor", "bright-lantern", "bright-meadow", "bright-river",
    "bright-summit", "bright-thicket", "bright-anchor", "bright-beacon",
    "bright-cedar", "bright-delta", "bright-ember", "bright-forge",
    "bright-glacier", "bright-haven", "bright-island", "bright-juniper",
    "bright-kestrel", "bright-ledge", "bright-marsh", "bright-nimbus",
    "bright-orchard", "bright-prairie", "bright-quarry", "bright-ridge",
    "bright-saddle", "bright-tundra", "bright-valley", "bright-wharf",
    "calm-falcon", "calm-otter", "calm-willow", "calm-canyon",
    "calm-harbor", "calm-lantern", "calm-meadow", "calm-river",
    "calm-summit", "calm-thicket", "calm-anchor", "calm-beacon",
    "calm-cedar", "calm-delta", "calm-ember", "calm-forge",
    "calm-glacier", "calm-haven", "calm-island", "calm-juniper",
    "calm-kestrel", "calm-ledge", "calm-marsh", "calm-nimbus",
    "calm-orchard", "calm-prairie", "calm-quarry", "calm-ridge",
    "calm-saddle", "calm-tundra", "calm-valley", "calm-wharf",
    "clever-falcon", "clever-otter", "clever-willow", "clever-canyon",
    "clever-harbor", "clever-lantern", "clever-meadow", "clever-river",
    "clever-summit", "clever-thicket", "clever-anchor", "clever-beacon",
    "clever-cedar", "clever-delta", "clever-ember", "clever-forge",
    "clever-glacier", "clever-haven", "clever-island", "clever-juniper",
    "clever-kestrel", "clever-ledge", "clever-marsh", "clever-nimbus",
    "clever-orchard", "clever-prairie", "clever-quarry", "clever-ridge",
    "clever-saddle", "clever-tundra", "clever-valley", "clever-wharf",
    "coral-falcon", "coral-otter", "coral-willow", "coral-canyon",
    "coral-harbor", "coral-lantern", "coral-meadow", "coral-river",
    "coral-summit", "coral-thicket", "coral-anchor", "coral-beacon",
    "coral-cedar", "coral-delta", "coral-ember", "coral-forge",
    "coral-glacier", "coral-haven", "coral-island", "coral-juniper",
    "coral-kestrel", "coral-ledge", "coral-marsh", "coral-nimbus",
    "coral-orchard", "coral-prairie", "coral-quarry", "coral-ridge",
    "coral-saddle", "coral-tundra", "coral-valley", "coral-wharf",
    "crimson-falcon", "crimson-otter", "crimson-willow", "crimson-canyon",
    "crimson-harbor", "crimson-lantern", "crimson-meadow", "crimson-river",
    "crimson-summit", "crimson-thicket", "crimson-anchor", "crimson-beacon",
    "crimson-cedar", "crimson-delta", "crimson-ember", "crimson-forge",
    "crimson-glacier", "crimson-haven", "crimson-island", "crimson-juniper",
    "crimson-kestrel", "crimson-ledge", "crimson-marsh", "crimson-nimbus",
    "crimson-orchard", "crimson-prairie", "crimson-quarry", "crimson-ridge",
    "crimson-saddle", "crimson-tundra", "crimson-valley", "crimson-wharf",
    "cosmic-falcon", "cosmic-otter", "cosmic-willow", "cosmic-canyon",
    "cosmic-harbor", "cosmic-lantern", "cosmic-meadow", "cosmic-river",
    "cosmic-summit", "cosmic-thicket", "cosmic-anchor", "cosmic-beacon",
    "cosmic-cedar", "cosmic-delta", "cosmic-ember", "cosmic-forge",
    "cosmic-glacier", "cosmic-haven", "cosmic-island", "cosmic-juniper",
    "cosmic-kestrel", "cosmic-ledge", "cosmic-marsh", "cosmic-nimbus",
    "cosmic-orchard", "cosmic-prairie", "cosmic-quarry", "cosmic-ridge",
    "cosmic-saddle", "cosmic-tundra", "cosmic-valley", "cosmic-wharf",
    "dusty-falcon", "dusty-otter", "dusty-willow", "dusty-canyon",
    "dusty-harbor", "dusty-lantern", "dusty-meadow", "dusty-river",
    "dusty-summit", "dusty-thicket", "dusty-anchor", "dusty-beacon",
    "dusty-cedar", "dusty-delta", "dusty-ember", "dusty-forge",
    "dusty-glacier", "dusty-haven", "dusty-island", "dusty-juniper",
    "dusty-kestrel", "dusty-ledge", "dusty-marsh", "dusty-nimbus",
    "dusty-orchard", "dusty-prairie", "dusty-quarry", "dusty-ridge",
    "dusty-saddle", "dusty-tundra", "dusty-valley", "dusty-wharf",
    "eager-falcon", "eager-otter", "eager-willow", "eager-canyon",
    "eager-harbor", "eager-lantern", "eager-meadow", "eager-river",
    "eager-summit", "eager-thicket", "eager-anchor", "eager-beacon",
    "eager-cedar", "eager-delta", "eager-ember", "eager-forge",
    "eager-glacier", "eager-haven", "eager-island", "eager-juniper",
    "eager-kestrel", "eager-ledge", "eager-marsh", "eager-nimbus",
    "eager-orchard", "eager-prairie", "eager-quarry", "eager-ridge",
    "eager-saddle", "eager-tundra", "eager-valley", "eager-wharf",
    "ember-falcon", "ember-otter", "ember-willow", "ember-canyon",
    "ember-harbor", "ember-lantern", "ember-meadow", "ember-river",
    "ember-summit", "ember-thicket", "ember-anchor", "ember-beacon",
    "ember-cedar", "ember-delta", "ember-ember", "ember-forge",
    "ember-glacier", "ember-haven", "ember-island", "ember-juniper",
    "ember-kestrel", "ember-ledge", "ember-marsh", "ember-nimbus",
    "ember-orchard", "ember-prairie", "ember-quarry", "ember-ridge",
    "ember-saddle", "ember-tundra", "ember-valley", "ember-wharf",
    "fierce-falcon", "fierce-otter", "fierce-willow", "fierce-canyon",
    "fierce-harbor", "fierce-lantern", "fierce-meadow", "fierce-river",
    "fierce-summit", "fierce-thicket", "fierce-anchor", "fierce-beacon",
    "fierce-cedar", "fierce-delta", "fierce-ember", "fierce-forge",
    "fierce-glacier", "fierce-haven", "fierce-island", "fierce-juniper",
    "fierce-kestrel", "fierce-ledge", "fierce-marsh", "fierce-nimbus",
    "fierce-orchard", "fierce-prairie", "fierce-quarry", "fierce-ridge",
    "fierce-saddle", "fierce-tundra", "fierce-valley", "fierce-wharf",
    "frosty-falcon", "frosty-otter", "frosty-willow", "frosty-canyon",
    "frosty-harbor", "frosty-lantern", "frosty-meadow", "frosty-river",
    "frosty-summit", "frosty-thicket", "frosty-anchor", "frosty-beacon",
    "frosty-cedar", "frosty-delta", "frosty-ember", "frosty-forge",
    "frosty-glacier", "frosty-haven", "frosty-island", "frosty-juniper",
    "frosty-kestrel", "frosty-ledge", "frosty-marsh", "frosty-nimbus",
    "frosty-orchard", "frosty-prairie", "frosty-quarry", "frosty-ridge",
    "frosty-saddle", "frosty-tundra", "frosty-valley", "frosty-wharf",
    "gentle-falcon", "gentle-otter", "gentle-willow", "gentle-canyon",
    "gentle-harbor", "gentle-lantern", "gentle-meadow", "gentle-river",
    "gentle-summit", "gentle-thicket", "gentle-anchor", "gentle-beacon",
    "gentle-cedar", "gentle-delta", "gentle-ember", "gentle-forge",
    "gentle-glacier", "gentle-haven", "gentle-island", "gentle-juniper",
    "gentle-kestrel", "gentle-ledge", "gentle-marsh", "gentle-nimbus",
    "gentle-orchard", "gentle-prairie", "gentle-quarry", "gentle-ridge",
    "gentle-saddle", "gentle-tundra", "gentle-valley", "gentle-wharf",
    "golden-falcon", "golden-otter", "golden-willow", "golden-canyon",
    "golden-harbor", "golden-lantern", "golden-meadow", "golden-river",
    "golden-summit", "golden-thicket", "golden-anchor", "golden-beacon",
    "golden-cedar", "golden-delta", "golden-ember", "golden-forge",
    "golden-glacier", "golden-haven", "golden-island", "golden-juniper",
    "golden-kestrel", "golden-ledge", "golden-marsh", "golden-nimbus",
    "golden-orchard", "golden-prairie", "golden-quarry", "golden-ridge",
    "golden-saddle", "golden-tundra", "golden-valley", "golden-wharf",
    "hidden-falcon", "hidden-otter", "hidden-willow", "hidden-canyon",
    "hidden-harbor", "hidden-lantern", "hidden-meadow", "hidden-river",
    "hidden-summit", "hidden-thicket", "hidden-anchor", "hidden-beacon",
    "hidden-cedar", "hidden-delta", "hidden-ember", "hidden-forge",
    "hidden-glacier", "hidden-haven", "hidden-island", "hidden-juniper",
    "hidden-kestrel", "hidden-ledge", "hidden-marsh", "hidden-nimbus",
    "hidden-orchard", "hidden-prairie", "hidden-quarry", "hidden-ridge",
    "hidden-saddle", "hidden-tundra", "hidden-valley", "hidden-wharf",
    "humble-falcon", "humble-otter", "humble-willow", "humble-canyon",
    "humble-harbor", "humble-lantern", "humble-meadow", "humble-river",
    "humble-summit", "humble-thicket", "humble-anchor", "humble-beacon",
    "humble-cedar", "humble-delta", "humble-ember", "humble-forge",
    "humble-glacier", "humble-haven", "humble-island", "humble-juniper",
    "humble-kestrel", "humble-ledge", "humble-marsh", "humble-nimbus",
    "humble-orchard", "humble-prairie", "humble-quarry", "humble-ridge",
    "humble-saddle", "humble-tundra", "humble-valley", "humble-wharf",
    "ivory-falcon", "ivory-otter", "ivory-willow", "ivory-canyon",
    "ivory-harbor", "ivory-lantern", "ivory-meadow", "ivory-river",
    "ivory-summit", "ivory-thicket", "ivory-anchor", "ivory-beacon",
    "ivory-cedar", "ivory-delta", "ivory-ember", "ivory-forge",
    "ivory-glacier", "ivory-haven", "ivory-island", "ivory-juniper",
    "ivory-kestrel", "ivory-ledge", "ivory-marsh", "ivory-nimbus",
    "ivory-orchard", "ivory-prairie", "ivory-quarry", "ivory-ridge",
    "ivory-saddle", "ivory-tundra", "ivory-valley", "ivory-wharf",
    "jade-falcon", "jade-otter", "jade-willow", "jade-canyon",
    "jade-harbor", "jade-lantern", "jade-meadow", "jade-river",
    "jade-summit", "jade-thicket", "jade-anchor", "jade-beacon",
    "jade-cedar", "jade-delta", "jade-ember", "jade-forge",
    "jade-glacier", "jade-haven", "jade-island", "jade-juniper",
    "jade-kestrel", "jade-ledge", "jade-marsh", "jade-nimbus",
    "jade-orchard", "jade-prairie", "jade-quarry", "jade-ridge",
    "jade-saddle", "jade-tundra", "jade-valley", "jade-wharf",
    "keen-falcon", "keen-otter", "keen-willow", "keen-canyon",
    "keen-harbor", "keen-lantern", "keen-meadow", "keen-river",
    "keen-summit", "keen-thicket", "keen-anchor", "keen-beacon",
    "keen-cedar", "keen-delta", "keen-ember", "keen-forge",
    "keen-glacier", "keen-haven", "keen-island", "keen-juniper",
    "keen-kestrel", "keen-ledge", "keen-marsh", "keen-nimbus",
    "keen-orchard", "keen-prairie", "keen-quarry", "keen-ridge",
    "keen-saddle", "keen-tundra", "keen-valley", "keen-wharf",
    "lively-falcon", "lively-otter", "lively-willow", "lively-canyon",
    "lively-harbor", "lively-lantern", "lively-meadow", "lively-river",
    "lively-summit", "lively-thicket", "lively-anchor", "lively-beacon",
    "lively-cedar", "lively-delta", "lively-ember", "lively-forge",
    "lively-glacier", "lively-haven", "lively-island", "lively-juniper",
    "lively-kestrel", "lively-ledge", "lively-marsh", "lively-nimbus",
    "lively-orchard", "lively-prairie", "lively-quarry", "lively-ridge",
    "lively-saddle", "lively-tundra", "lively-valley", "lively-wharf",
    "lucky-falcon", "lucky-otter", "lucky-willow", "lucky-canyon",
    "lucky-harbor", "lucky-lantern", "lucky-meadow", "lucky-river",
    "lucky-summit", "lucky-thicket", "lucky-anchor", "lucky-beacon",
    "lucky-cedar", "lucky-delta", "lucky-ember", "lucky-forge",
    "lucky-glacier", "lucky-haven", "lucky-island", "lucky-juniper",
    "lucky-kestrel", "lucky-ledge", "lucky-marsh", "lucky-nimbus",
    "lucky-orchard", "lucky-prairie", "lucky-quarry", "lucky-ridge",
    "lucky-saddle", "lucky-tundra", "lucky-valley", "lucky-wharf",
    "mellow-falcon", "mellow-otter", "mellow-willow", "mellow-canyon",
    "mellow-harbor", "mellow-lantern", "mellow-meadow", "mellow-river",
    "mellow-summit", "mellow-thicket", "mellow-anchor", "mellow-beacon",
    "mellow-cedar", "mellow-delta", "mellow-ember", "mellow-forge",
    "mellow-glacier", "mellow-haven", "mellow-island", "mellow-juniper",
    "mellow-kestrel", "mellow-ledge", "mellow-marsh", "mellow-nimbus",
    "mellow-orchard", "mellow-prairie", "mellow-quarry", "mellow-ridge",
    "mellow-saddle", "mellow-tundra", "mellow-valley", "mellow-wharf",
    "misty-falcon", "misty-otter", "misty-willow", "misty-canyon",
    "misty-harbor", "misty-lantern", "misty-meadow", "misty-river",
    "misty-summit", "misty-thicket", "misty-anchor", "misty-beacon",
    "misty-cedar", "misty-delta", "misty-ember", "misty-forge",
    "misty-glacier", "misty-haven", "misty-island", "misty-juniper",
    "misty-kestrel", "misty-ledge", "misty-marsh", "misty-nimbus",
    "misty-orchard", "misty-prairie", "misty-quarry", "misty-ridge",
    "misty-saddle", "misty-tundra", "misty-valley", "misty-wharf",
    "noble-falcon", "noble-otter", "noble-willow", "noble-canyon",
    "noble-harbor", "noble-lantern", "noble-meadow", "noble-river",
    "noble-summit", "noble-thicket", "noble-anchor", "noble-beacon",
    "noble-cedar", "noble-delta", "noble-ember", "noble-forge",
    "noble-glacier", "noble-haven", "noble-island", "noble-juniper",
    "noble-kestrel", "noble-ledge", "noble-marsh", "noble-nimbus",
    "noble-orchard", "noble-prairie", "noble-quarry", "noble-ridge",
    "noble-saddle", "noble-tundra", "noble-valley", "noble-wharf",
    "obsidian-falcon", "obsidian-otter", "obsidian-willow", "obsidian-canyon",
    "obsidian-harbor", "obsidian-lantern", "obsidian-meadow", "obsidian-river",
    "obsidian-summit", "obsidian-thicket", "obsidian-anchor", "obsidian-beacon",
    "obsidian-cedar", "obsidian-delta", "obsidian-ember", "obsidian-forge",
    "obsidian-glacier", "obsidian-haven", "obsidian-island", "obsidian-juniper",
    "obsidian-kestrel", "obsidian-ledge", "obsidian-marsh", "obsidian-nimbus",
    "obsidian-orchard", "obsidian-prairie", "obsidian-quarry", "obsidian-ridge",
    "obsidian-saddle", "obsidian-tundra", "obsidian-valley", "obsidian-wharf",
    "olive-falcon", "olive-otter", "olive-willow", "olive-canyon",
    "olive-harbor", "olive-lantern", "olive-meadow", "olive-river",
    "olive-summit", "olive-thicket", "olive-anchor", "olive-beacon",
    "olive-cedar", "olive-delta", "olive-ember", "olive-forge",
    "olive-glacier", "olive-haven", "olive-island", "olive-juniper",
    "olive-kestrel", "olive-ledge", "olive-marsh", "olive-nimbus",
    "olive-orchard", "olive-prairie", "olive-quarry", "olive-ridge",
    "olive-saddle", "olive-tundra", "olive-valley", "olive-wharf",
    "opal-falcon", "opal-otter", "opal-willow", "opal-canyon",
    "opal-harbor", "opal-lantern", "opal-meadow", "opal-river",
    "opal-summit", "opal-thicket", "opal-anchor", "opal-beacon",
    "opal-cedar", "opal-delta", "opal-ember", "opal-forge",
    "opal-glacier", "opal-haven", "opal-island", "opal-juniper",
    "opal-kestrel", "opal-ledge", "opal-marsh", "opal-nimbus",
    "opal-orchard", "opal-prairie", "opal-quarry", "opal-ridge",
    "opal-saddle", "opal-tundra", "opal-valley", "opal-wharf",
    "pale-falcon", "pale-otter", "pale-willow", "pale-canyon",
    "pale-harbor", "pale-lantern", "pale-meadow", "pale-river",
    "pale-summit", "pale-thicket", "pale-anchor", "pale-beacon",
    "pale-cedar", "pale-delta", "pale-ember", "pale-forge",
    "pale-glacier", "pale-haven", "pale-island", "pale-juniper",
    "pale-kestrel", "pale-ledge", "pale-marsh", "pale-nimbus",
    "pale-orchard", "pale-prairie", "pale-quarry", "pale-ridge",
    "pale-saddle", "pale-tundra", "pale-valley", "pale-wharf",
    "plain-falcon", "plain-otter", "plain-willow", "plain-canyon",
    "plain-harbor", "plain-lantern", "plain-meadow", "plain-river",
    "plain-summit", "plain-thicket", "plain-anchor", "plain-beacon",
    "plain-cedar", "plain-delta", "plain-ember", "plain-forge",
    "plain-glacier", "plain-haven", "plain-island", "plain-juniper",
    "plain-kestrel", "plain-ledge", "plain-marsh", "plain-nimbus",
    "plain-orchard", "plain-prairie", "plain-quarry", "plain-ridge",
    "plain-saddle", "plain-tundra", "plain-valley", "plain-wharf",];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn has_at_least_1024_entries() {
        assert!(WORDLIST.len() >= 1024);
    }

    #[test]
    fn entries_are_unique() {
        let set: HashSet<&str> = WORDLIST.iter().copied().collect();
        assert_eq!(set.len(), WORDLIST.len());
    }
}
