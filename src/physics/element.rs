use crate::physics::filters::{FilterAttributes, FilterData};
use crate::physics::handles::ElementId;

/// The minimal capability shared by every participant in collision:
/// shapes, and non-shape elements such as joints.
///
/// An element carries an identity token used by the broad phase and the
/// filtering system, and can report its filter information on demand.
/// The filter query is pure and infallible; the data is always present
/// once the element exists. Consumers must not cache the result beyond
/// one step, since an element's filter payload may change between steps.
pub trait ElementSim {
    /// Gets the identity token of the element.
    fn element_id(&self) -> ElementId;

    /// Gets the collision group/mask pairing and application defined payload
    /// the broad phase uses to decide whether two elements are even candidates
    /// for collision.
    fn get_filter_info(&self) -> (FilterAttributes, FilterData);
}
