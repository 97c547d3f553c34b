/// Tile kinds and their interaction traits.
///
/// Every kind maps to one fixed `TileTraits` record, so movement and hazard
/// rules ask the table instead of matching on kinds. Adding a kind means
/// adding a row here, nothing else.
///
/// ## Trait table
///   kind          enterable pushable crushable toxic  sprite
///   Empty         yes       -        -         -      (none)
///   Wall          -         -        -         -      wall
///   Dirt          yes       -        -         -      dirt
///   ExitInactive  -         -        -         -      exit-inactive
///   ExitActive    yes       -        -         -      exit-active
///   Collectable   yes       -        -         -      grub
///   Boulder       -         yes      -         -      stone
///   Player        -         -        yes       -      player-right
///   Enemy         -         -        yes       yes    fox
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum TileKind {
    #[default]
    Empty,
    Wall,
    Dirt,
    ExitInactive,
    ExitActive,
    Collectable,
    Boulder,
    Player,
    Enemy,
}

/// Fixed per-kind attributes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TileTraits {
    /// A mover may step into this cell, consuming whatever is there.
    pub enterable: bool,
    /// Can be shoved one cell further when the cell beyond is empty.
    pub pushable: bool,
    /// Destroyed when a boulder lands on it.
    pub crushable: bool,
    /// Kills the player by orthogonal adjacency.
    pub toxic: bool,
    /// Visual identity for renderers. The simulation never reads it.
    pub sprite: Option<&'static str>,
}

impl TileTraits {
    const fn new(sprite: Option<&'static str>) -> Self {
        TileTraits { enterable: false, pushable: false, crushable: false, toxic: false, sprite }
    }

    const fn enterable(mut self) -> Self { self.enterable = true; self }
    const fn pushable(mut self) -> Self { self.pushable = true; self }
    const fn crushable(mut self) -> Self { self.crushable = true; self }
    const fn toxic(mut self) -> Self { self.toxic = true; self }
}

const EMPTY: TileTraits = TileTraits::new(None).enterable();
const WALL: TileTraits = TileTraits::new(Some("wall"));
const DIRT: TileTraits = TileTraits::new(Some("dirt")).enterable();
const EXIT_INACTIVE: TileTraits = TileTraits::new(Some("exit-inactive"));
const EXIT_ACTIVE: TileTraits = TileTraits::new(Some("exit-active")).enterable();
const COLLECTABLE: TileTraits = TileTraits::new(Some("grub")).enterable();
const BOULDER: TileTraits = TileTraits::new(Some("stone")).pushable();
const PLAYER: TileTraits = TileTraits::new(Some("player-right")).crushable();
const ENEMY: TileTraits = TileTraits::new(Some("fox")).crushable().toxic();

impl TileKind {
    pub const ALL: [TileKind; 9] = [
        TileKind::Empty,
        TileKind::Wall,
        TileKind::Dirt,
        TileKind::ExitInactive,
        TileKind::ExitActive,
        TileKind::Collectable,
        TileKind::Boulder,
        TileKind::Player,
        TileKind::Enemy,
    ];

    pub fn traits(self) -> &'static TileTraits {
        match self {
            TileKind::Empty => &EMPTY,
            TileKind::Wall => &WALL,
            TileKind::Dirt => &DIRT,
            TileKind::ExitInactive => &EXIT_INACTIVE,
            TileKind::ExitActive => &EXIT_ACTIVE,
            TileKind::Collectable => &COLLECTABLE,
            TileKind::Boulder => &BOULDER,
            TileKind::Player => &PLAYER,
            TileKind::Enemy => &ENEMY,
        }
    }

    pub fn is_enterable(self) -> bool { self.traits().enterable }
    pub fn is_pushable(self) -> bool { self.traits().pushable }
    pub fn is_crushable(self) -> bool { self.traits().crushable }
    pub fn is_toxic(self) -> bool { self.traits().toxic }

    pub fn sprite(self) -> Option<&'static str> {
        self.traits().sprite
    }

    /// Dynamic kinds become entities at load time. Empty and Wall stay in
    /// the background grid.
    pub fn is_dynamic(self) -> bool {
        !matches!(self, TileKind::Empty | TileKind::Wall)
    }

    /// Map a level glyph to its kind (case-insensitive).
    pub fn from_glyph(ch: char) -> Option<TileKind> {
        match ch.to_ascii_uppercase() {
            ' ' | 'A' => Some(TileKind::Empty),
            'D' => Some(TileKind::Dirt),
            'W' => Some(TileKind::Wall),
            'P' => Some(TileKind::Player),
            'X' => Some(TileKind::ExitInactive),
            'G' => Some(TileKind::Collectable),
            'O' => Some(TileKind::Boulder),
            'F' => Some(TileKind::Enemy),
            _ => None,
        }
    }

    /// Canonical glyph. ExitActive has no glyph of its own in level files
    /// and is written as an inactive exit.
    #[cfg(test)]
    pub fn glyph(self) -> char {
        match self {
            TileKind::Empty => ' ',
            TileKind::Wall => 'W',
            TileKind::Dirt => 'D',
            TileKind::ExitInactive | TileKind::ExitActive => 'X',
            TileKind::Collectable => 'G',
            TileKind::Boulder => 'O',
            TileKind::Player => 'P',
            TileKind::Enemy => 'F',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_table_matches_kinds() {
        let enterable: Vec<_> = TileKind::ALL.iter().filter(|k| k.is_enterable()).collect();
        assert_eq!(
            enterable,
            [&TileKind::Empty, &TileKind::Dirt, &TileKind::ExitActive, &TileKind::Collectable]
        );
        assert!(TileKind::Boulder.is_pushable());
        assert!(TileKind::Player.is_crushable() && !TileKind::Player.is_toxic());
        assert!(TileKind::Enemy.is_crushable() && TileKind::Enemy.is_toxic());
        assert!(!TileKind::Wall.is_enterable() && !TileKind::Wall.is_pushable());
        assert!(!TileKind::ExitInactive.is_enterable());
    }

    #[test]
    fn glyphs_are_case_insensitive() {
        assert_eq!(TileKind::from_glyph('g'), Some(TileKind::Collectable));
        assert_eq!(TileKind::from_glyph('G'), Some(TileKind::Collectable));
        assert_eq!(TileKind::from_glyph('a'), Some(TileKind::Empty));
        assert_eq!(TileKind::from_glyph(' '), Some(TileKind::Empty));
        assert_eq!(TileKind::from_glyph('#'), None);
    }

    #[test]
    fn glyph_round_trips_for_level_kinds() {
        for kind in TileKind::ALL {
            if kind == TileKind::ExitActive { continue; }
            assert_eq!(TileKind::from_glyph(kind.glyph()), Some(kind));
        }
    }

    #[test]
    fn only_background_kinds_are_static() {
        assert!(!TileKind::Empty.is_dynamic());
        assert_eq!(TileKind::default(), TileKind::Empty);
        assert!(!TileKind::Wall.is_dynamic());
        assert!(TileKind::Dirt.is_dynamic());
        assert!(TileKind::Enemy.is_dynamic());
    }

    #[test]
    fn sprite_tags() {
        assert_eq!(TileKind::Empty.sprite(), None);
        assert_eq!(TileKind::Enemy.sprite(), Some("fox"));
        assert_eq!(TileKind::Collectable.sprite(), Some("grub"));
    }
}
