pub struct ConfigGetArgs {
    pub section: String,
}

pub struct ConfigSetArgs {
    pub section: String,
    pub value: String,
}
