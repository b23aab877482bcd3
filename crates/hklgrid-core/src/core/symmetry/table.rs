use phf::{Map, phf_map};

/// Space group number and Hall symbol, keyed by Hermann-Mauguin name.
#[rustfmt::skip]
pub static HM_TO_HALL: Map<&'static str, (u8, &'static str)> = phf_map! {
    // --- Triclinic ---
    "P 1"  => (1, "P 1"),
    "P -1" => (2, "-P 1"),

    // --- Monoclinic (unique axis b) ---
    "P 1 2 1"    => (3, "P 2y"),
    "P 1 21 1"   => (4, "P 2yb"),
    "C 1 2 1"    => (5, "C 2y"),
    "P 1 m 1"    => (6, "P -2y"),
    "P 1 c 1"    => (7, "P -2yc"),
    "C 1 c 1"    => (9, "C -2yc"),
    "P 1 2/m 1"  => (10, "-P 2y"),
    "P 1 21/m 1" => (11, "-P 2yb"),
    "C 1 2/m 1"  => (12, "-C 2y"),
    "P 1 2/c 1"  => (13, "-P 2yc"),
    "P 1 21/c 1" => (14, "-P 2ybc"),
    "C 1 2/c 1"  => (15, "-C 2yc"),

    // --- Orthorhombic ---
    "P 2 2 2"    => (16, "P 2 2"),
    "P 2 2 21"   => (17, "P 2c 2"),
    "P 21 21 2"  => (18, "P 2 2ab"),
    "P 21 21 21" => (19, "P 2ac 2ab"),
    "C 2 2 21"   => (20, "C 2c 2"),
    "C 2 2 2"    => (21, "C 2 2"),
    "F 2 2 2"    => (22, "F 2 2"),
    "I 2 2 2"    => (23, "I 2 2"),
    "I 21 21 21" => (24, "I 2b 2c"),
    "P m m m"    => (47, "-P 2 2"),
    "P b c a"    => (61, "-P 2ac 2ab"),
    "P n m a"    => (62, "-P 2ac 2n"),

    // --- Tetragonal ---
    "P 4"        => (75, "P 4"),
    "P 41"       => (76, "P 4w"),
    "P 42"       => (77, "P 4c"),
    "P 43"       => (78, "P 4cw"),
    "I 4"        => (79, "I 4"),
    "I 41"       => (80, "I 4bw"),
    "P 4 2 2"    => (89, "P 4 2"),
    "P 4 21 2"   => (90, "P 4ab 2ab"),
    "P 41 2 2"   => (91, "P 4w 2c"),
    "P 41 21 2"  => (92, "P 4abw 2nw"),
    "P 42 2 2"   => (93, "P 4c 2"),
    "P 42 21 2"  => (94, "P 4n 2n"),
    "P 43 2 2"   => (95, "P 4cw 2c"),
    "P 43 21 2"  => (96, "P 4nw 2abw"),
    "I 4 2 2"    => (97, "I 4 2"),
    "I 41 2 2"   => (98, "I 4bw 2bw"),
    "P 4/m m m"  => (123, "-P 4 2"),

    // --- Trigonal (hexagonal axes) ---
    "P 3"        => (143, "P 3"),
    "P 31"       => (144, "P 31"),
    "P 32"       => (145, "P 32"),
    "H 3"        => (146, "R 3"),
    "P 3 1 2"    => (149, "P 3 2"),
    "P 3 2 1"    => (150, "P 3 2\""),
    "P 31 1 2"   => (151, "P 31 2c (0 0 1)"),
    "P 31 2 1"   => (152, "P 31 2\""),
    "P 32 1 2"   => (153, "P 32 2c (0 0 -1)"),
    "P 32 2 1"   => (154, "P 32 2\""),
    "H 3 2"      => (155, "R 3 2\""),

    // --- Hexagonal ---
    "P 6"        => (168, "P 6"),
    "P 61"       => (169, "P 61"),
    "P 65"       => (170, "P 65"),
    "P 62"       => (171, "P 62"),
    "P 64"       => (172, "P 64"),
    "P 63"       => (173, "P 6c"),
    "P 6 2 2"    => (177, "P 6 2"),
    "P 61 2 2"   => (178, "P 61 2 (0 0 -1)"),
    "P 65 2 2"   => (179, "P 65 2 (0 0 1)"),
    "P 62 2 2"   => (180, "P 62 2 (0 0 4)"),
    "P 64 2 2"   => (181, "P 64 2 (0 0 2)"),
    "P 63 2 2"   => (182, "P 6c 2c"),

    // --- Cubic ---
    "P 2 3"      => (195, "P 2 2 3"),
    "F 2 3"      => (196, "F 2 2 3"),
    "I 2 3"      => (197, "I 2 2 3"),
    "P 21 3"     => (198, "P 2ac 2ab 3"),
    "I 21 3"     => (199, "I 2b 2c 3"),
    "P 4 3 2"    => (207, "P 4 2 3"),
    "P 42 3 2"   => (208, "P 4n 2 3"),
    "F 4 3 2"    => (209, "F 4 2 3"),
    "F 41 3 2"   => (210, "F 4d 2 3"),
    "I 4 3 2"    => (211, "I 4 2 3"),
    "P 43 3 2"   => (212, "P 4acd 2ab 3"),
    "P 41 3 2"   => (213, "P 4bd 2ab 3"),
    "I 41 3 2"   => (214, "I 4bd 2c 3"),
    "P m -3 m"   => (221, "-P 4 2 3"),
};

/// Short and alternative names accepted in place of the full symbol.
pub static HM_ALIASES: Map<&'static str, &'static str> = phf_map! {
    "P 2" => "P 1 2 1",
    "P 21" => "P 1 21 1",
    "C 2" => "C 1 2 1",
    "P 2/m" => "P 1 2/m 1",
    "P 21/c" => "P 1 21/c 1",
    "C 2/c" => "C 1 2/c 1",
    "R 3" => "H 3",
    "R 3:H" => "H 3",
    "R 32" => "H 3 2",
    "R 3 2" => "H 3 2",
    "R 3 2:H" => "H 3 2",
    "H 32" => "H 3 2",
};
