//! Built-in reference lists, used until (or unless) an external workbook loads

use crate::types::SupplierRule;

pub const STORE_CHAINS: &[&str] = &[
    "Aldi", "Alleanza 3.0", "Brico Io", "Brico OK", "Bricocenter", "Bricofer",
    "Carrefour", "CFadda", "Conad", "Coop Etruria", "Coop fi", "Esselunga",
    "Eurospin", "IKEA", "Leroy Merlin", "Lidl", "OBI", "Pam", "Penny",
    "Tigros", "Viridea",
];

pub const STORE_NAMES: &[&str] = &[
    "Altopascio", "Arancio", "Campi Bisenzio", "Cascina", "Empoli", "Firenze",
    "Follonica", "Grosseto", "Livorno", "Lucca", "Monsummano", "Montecatini",
    "Pescia", "Piombino", "Pisa", "Pistoia", "Pontedera", "Porcari",
    "San Concordio", "Scandicci", "Sesto Fiorentino", "Viareggio",
];

pub const PLANTS: &[&str] = &[
    "Abete", "Aechmea", "Agrifoglio", "Agrume", "Alberi da frutto", "Alga palla",
    "Anthurium", "Aptenia", "Arbusti da siepe", "Aromatiche", "Azalea", "Basilico",
    "Begonia", "Bromelia", "Bulbi", "Cactus", "Calathea", "Calluna", "Camelia",
    "Campanula", "Cavolo ornamentale", "Celosia", "Ciclamino", "Cocus nocifera",
    "Crisantemo", "Cupressus", "Cycas", "Dipladenia", "Dracaena", "Edera",
    "Erba gatto", "Erica", "Euonymus", "Euphorbia milii", "Felce", "Ficus ginseng",
    "Ficus robusta", "Fragola", "Gardenia", "Garofano", "Gelsomino", "Geranio",
    "Gerbera", "Guzmania", "Hebe", "Helleborus", "Kalanchoe", "Kentia", "Lavanda",
    "Limone", "Monstera", "Orchidea", "Ortensia", "Pachira", "Peonia", "Petunia",
    "Phalaenopsis", "Pino", "Portulaca", "Pothos", "Primula", "Rosa", "Sansevieria",
    "Spathiphyllum", "Stella di Natale", "Strelitzia", "Succulenta", "Surfinia",
    "Ulivo", "Vriesea", "Yucca", "Zamioculcas",
];

pub const CUT_FLOWERS: &[&str] = &[
    "Alstroemerie", "Amarilli", "Anemoni", "Anthurium", "Bq. misto grande",
    "Bq. misto medio", "Bq. misto piccolo", "Calle", "Crisantemi", "Eucalipto",
    "Fresie", "Garofani", "Gerbere", "Girasoli", "Gladioli", "Ilex", "Iris",
    "Lilium", "Lisianthus", "Lucky Bamboo", "Orchidee Cymbidium", "Peonie",
    "Ranuncoli", "Rose", "Rose solidal", "Ruscus", "Solidago", "Strelitzie",
    "Tulipani",
];

pub const SUPPLIERS: &[&str] = &[
    "Baldi", "Bregliano", "Eurofresh", "Fitimex", "Flora Toscana", "Floragro",
    "Giromagi", "Global Plant", "Losiflores", "Maffucci", "Medici", "Morotti",
    "Osioflor", "Pagano", "Pastor", "PD Plants", "Procoflora", "Sangiorgio",
];

pub const VASE_DIAMETERS: &[&str] = &[
    "6", "7", "9", "10", "10.5", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "24", "26", "28", "30",
];

pub const STEM_COUNTS: &[&str] = &["1", "3", "5", "7", "9", "10", "12", "15", "20", "25"];

/// (root, supplier). Table order is significant: the resolver returns the
/// first root that prefixes the EAN.
pub const SUPPLIER_EAN_RULES: &[(&str, &str)] = &[
    ("8003568", "Fitimex"),
    ("8008638", "Eurofresh"),
    ("8010896", "Baldi"),
    ("8013129", "Bregliano"),
    ("8013451", "Pastor Luigi"),
    ("8019134", "Losiflores"),
    ("8021790", "Sangiorgio"),
    ("8023654", "Osioflor"),
    ("8024278", "Morotti"),
    ("8025761", "Flora Toscana"),
    ("8027204", "Maffucci"),
    ("8719548", "Procoflora"),
    ("803261051", "Floragro"),
    ("805004331", "Maffucci"),
    ("805127778", "PD Plants"),
    ("805534828", "Pagano"),
    ("805772306", "Medici"),
    ("805804573", "PD Plants"),
    ("805809362", "Pagano"),
    ("871912803", "Procoflora"),
];

pub(crate) fn to_owned_list(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub(crate) fn supplier_rules() -> Vec<SupplierRule> {
    SUPPLIER_EAN_RULES
        .iter()
        .map(|(root, supplier)| SupplierRule::new(*root, *supplier))
        .collect()
}
