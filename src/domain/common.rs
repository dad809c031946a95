/// Supplies a presentation-ready label for logs.
pub trait Displayable {
    fn display_label(&self) -> String;
}
