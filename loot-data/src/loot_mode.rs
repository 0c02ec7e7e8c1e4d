bitflags::bitflags! {
    /// Selects which table entries take part in a loot roll. Encounters with
    /// optional hard modes enable the matching bits on top of `DEFAULT`.
    #[repr(transparent)]
    pub struct LootModeFlags : u16 {
        const DEFAULT     = 1 << 0;
        const HARD_MODE_1 = 1 << 1;
        const HARD_MODE_2 = 1 << 2;
        const HARD_MODE_3 = 1 << 3;
        const HARD_MODE_4 = 1 << 4;
        const JUNK_FISH   = 1 << 15;
    }
}

impl Default for LootModeFlags {
    fn default() -> Self {
        LootModeFlags::DEFAULT
    }
}
